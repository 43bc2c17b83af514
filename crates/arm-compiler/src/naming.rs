//! Output file naming

use arm_fs::NormalizedPath;

/// Sanitize a string for use as a filename.
pub fn sanitize_filename(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '_' || c == '.' {
                c
            } else {
                '-'
            }
        })
        .collect()
}

/// Path of the compiled file for one item of a source file.
///
/// The source's directory is kept. The base name is the source stem when
/// the resource has a single item and `<stem>_<item-id>` otherwise.
pub fn output_path(
    source: &NormalizedPath,
    item_id: &str,
    single_item: bool,
    extension: &str,
) -> NormalizedPath {
    let stem = sanitize_filename(source.file_stem().unwrap_or("resource"));
    let base = if single_item {
        stem
    } else {
        format!("{}_{}", stem, sanitize_filename(item_id))
    };
    let filename = format!("{base}{extension}");
    match source.parent() {
        Some(parent) if !parent.as_str().is_empty() => parent.join(&filename),
        _ => NormalizedPath::new(filename),
    }
}

/// Whether a source path names a compilable resource document.
pub fn is_compilable(path: &NormalizedPath) -> bool {
    let name = path.as_str();
    name.ends_with(".yml") || name.ends_with(".yaml")
}
