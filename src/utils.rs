use std::fmt::Display;

use indicatif::ProgressStyle;

pub fn pb_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "[{elapsed_precise}] {bar:40.cyan/blue} {pos:>6}/{len:6} {per_sec} ETA {eta} {msg}",
    )
    .expect("failed to build progress style")
}

/// 列表过长时只展示首尾各 5 项
pub fn abbreviate<T: Display>(items: &[T]) -> String {
    let join = |items: &[T]| items.iter().map(|t| t.to_string()).collect::<Vec<_>>().join(", ");
    if items.len() <= 10 {
        format!("[{}]", join(items))
    } else {
        format!("[{}] ... [{}]", join(&items[..5]), join(&items[items.len() - 5..]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abbreviate() {
        assert_eq!(abbreviate(&[1, 2, 3]), "[1, 2, 3]");
        let long: Vec<u32> = (1..=12).collect();
        assert_eq!(abbreviate(&long), "[1, 2, 3, 4, 5] ... [8, 9, 10, 11, 12]");
    }
}
