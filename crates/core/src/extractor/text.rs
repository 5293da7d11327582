/// Decodes UTF-8, dropping invalid byte sequences instead of replacing them,
/// and folds `\r\n` and lone `\r` line endings into `\n`.
pub fn extract_txt(bytes: &[u8]) -> String {
    let mut decoded = String::with_capacity(bytes.len());
    let mut rest = bytes;

    loop {
        match std::str::from_utf8(rest) {
            Ok(valid) => {
                decoded.push_str(valid);
                break;
            }
            Err(error) => {
                let (valid, after) = rest.split_at(error.valid_up_to());
                decoded.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let invalid_len = error.error_len().unwrap_or(after.len());
                rest = &after[invalid_len..];
            }
        }
    }

    normalize_line_endings(&decoded)
}

fn normalize_line_endings(text: &str) -> String {
    if !text.contains('\r') {
        return text.to_string();
    }
    text.replace("\r\n", "\n").replace('\r', "\n")
}
