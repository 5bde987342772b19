use std::collections::HashSet;

/// Replace characters that are illegal in common filesystems and collapse
/// whitespace runs into single underscores.
pub fn sanitize_file_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_was_space = false;

    for c in name.trim().chars() {
        if c.is_whitespace() {
            if !last_was_space {
                out.push('_');
                last_was_space = true;
            }
            continue;
        }
        last_was_space = false;

        match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => out.push('_'),
            c if c.is_control() => out.push('_'),
            c => out.push(c),
        }
    }

    if out.is_empty() {
        out.push_str("foto");
    }
    out
}

/// Hands out archive-unique filenames: the first `foto.jpg` stays `foto.jpg`,
/// the second becomes `foto_2.jpg`, and so on, with the counter inserted
/// before the extension.
#[derive(Debug, Default)]
pub struct NameAllocator {
    used: HashSet<String>,
}

impl NameAllocator {
    pub fn allocate(&mut self, name: &str) -> String {
        let sanitized = sanitize_file_name(name);

        if self.used.insert(sanitized.clone()) {
            return sanitized;
        }

        let (stem, extension) = match sanitized.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem.to_string(), format!(".{}", ext)),
            _ => (sanitized.clone(), String::new()),
        };

        let mut counter = 2;
        loop {
            let candidate = format!("{}_{}{}", stem, counter, extension);
            if self.used.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}
