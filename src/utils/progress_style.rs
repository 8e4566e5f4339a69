use indicatif::ProgressStyle;

const ONLY_MESSAGE_TEMPLATE: &str = "{spinner} {wide_msg}";
const REPOSITORY_TEMPLATE: &str =
    "{spinner} {msg:30} {wide_bar} {pos:>4}/{len:4} [{elapsed_precise}]";

pub struct ProgressStyleTemplate;

impl ProgressStyleTemplate {
    pub fn only_message() -> ProgressStyle {
        ProgressStyle::with_template(ONLY_MESSAGE_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    /// Bar over completed repositories.
    pub fn repository_bar() -> ProgressStyle {
        ProgressStyle::with_template(REPOSITORY_TEMPLATE)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_are_valid() {
        assert!(ProgressStyle::with_template(ONLY_MESSAGE_TEMPLATE).is_ok());
        assert!(ProgressStyle::with_template(REPOSITORY_TEMPLATE).is_ok());
    }
}
