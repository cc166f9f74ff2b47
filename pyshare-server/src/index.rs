//! Minimal HTML index of the shared folder for plain browsers

use pyshare_core::FileRecord;

/// Human-readable size, 1024-based with two decimals at most
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

    if bytes == 0 {
        return "0 Bytes".to_string();
    }

    let exp = ((bytes as f64).ln() / 1024f64.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);
    let value = bytes as f64 / 1024f64.powi(exp as i32);
    let rounded = (value * 100.0).round() / 100.0;

    format!("{} {}", rounded, UNITS[exp])
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn render_index(files: &[FileRecord], is_active: bool) -> String {
    let status = if is_active { "Sharing active" } else { "Sharing inactive" };

    let items: String = if files.is_empty() {
        "<li>No files shared</li>\n".to_string()
    } else {
        files
            .iter()
            .map(|f| {
                format!(
                    "<li><a href=\"{}\">{}</a> {}</li>\n",
                    escape(&f.url),
                    escape(&f.name),
                    format_bytes(f.size)
                )
            })
            .collect()
    };

    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"UTF-8\">\n\
<meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n\
<title>PyShare - Network File Sharing</title>\n</head>\n<body>\n\
<h1>PyShare</h1>\n<p>{}</p>\n<ul>\n{}</ul>\n</body>\n</html>\n",
        status, items
    )
}
