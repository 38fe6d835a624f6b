//! # Utility Functions Module
//!
//! Helpers for building external tool argument vectors.

/// Converts an iterable of string-like items to `Vec<String>`.
///
/// Used to build ffmpeg/ffprobe argv vectors without repeating `.to_string()`.
///
/// # Example
/// ```rust
/// use video_metadata_updater::utils::to_string_vec;
///
/// let args = to_string_vec(["-c", "copy"]);
/// assert_eq!(args, vec!["-c".to_string(), "copy".to_string()]);
/// ```
pub fn to_string_vec<T, I>(items: I) -> Vec<String>
where
    T: ToString,
    I: IntoIterator<Item = T>,
{
    items.into_iter().map(|item| item.to_string()).collect()
}

/// Macro for building argument vectors from mixed displayable values.
///
/// # Example
/// ```rust
/// use video_metadata_updater::args;
///
/// let input = "/media/show.mkv";
/// let args = args!["-i", input, "-c", "copy"];
/// assert_eq!(args.len(), 4);
/// ```
#[macro_export]
macro_rules! args {
    [$($item:expr),* $(,)?] => {
        $crate::utils::to_string_vec([$($item.to_string()),*])
    };
}

/// Rende un argv leggibile per i log (quoting minimale stile shell)
pub fn render_for_log(program: &str, args: &[String]) -> String {
    let mut rendered = String::from(program);
    for arg in args {
        rendered.push(' ');
        if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '\'') {
            rendered.push('\'');
            rendered.push_str(&arg.replace('\'', r"'\''"));
            rendered.push('\'');
        } else {
            rendered.push_str(arg);
        }
    }
    rendered
}
