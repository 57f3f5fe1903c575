//! Collapse of nested non-nesting tag pairs.
//!
//! `[b]` inside `[b]` carries no meaning; when the dispatcher emits a
//! non-nesting pair around content that already contains the same kind of
//! pair, the inner markers are merged into the outer ones. Differently-named
//! nesting (`[b][i]x[/i][/b]`) is left alone.

use regex::Regex;

/// Marker regexes for one non-nesting template pair, compiled once per rule.
/// `_` in the open template stands for any parameter, so `[color=red]` and
/// `[color=blue]` count as the same kind.
#[derive(Debug)]
pub(crate) struct Reducer {
    open_marks: Regex,
    close_marks: Regex,
}

impl Reducer {
    pub(crate) fn for_templates(open: &str, close: &str) -> Self {
        Self {
            open_marks: Regex::new(&format!("(?si){}", escape_template(open))).unwrap(),
            close_marks: Regex::new(&format!("(?si){}", escape_template(close))).unwrap(),
        }
    }
}

fn escape_template(template: &str) -> String {
    template
        .replace('[', r"\[")
        .replace(']', r"\]")
        .replace('_', r"[^\]]+")
}

/// Wrap `content` in `open`/`close`, removing any same-kind markers already
/// inside so that no directly nested pair of this kind survives. A pair left
/// empty by the merge is deleted outright. Idempotent.
pub(crate) fn reduce(content: &str, open: &str, close: &str, reducer: &Reducer) -> String {
    let inner = reducer.open_marks.replace_all(content, "");
    let inner = reducer.close_marks.replace_all(&inner, "");
    let wrapped = format!("{open}{inner}{close}");
    wrapped.replace(&format!("{open}{close}"), "")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn bold() -> Reducer {
        Reducer::for_templates("[b]", "[/b]")
    }

    fn color() -> Reducer {
        Reducer::for_templates("[color=_]", "[/color]")
    }

    #[test]
    fn plain_content_is_wrapped() {
        assert_eq!(reduce("test", "[b]", "[/b]", &bold()), "[b]test[/b]");
    }

    #[test]
    fn nested_same_kind_collapses() {
        assert_eq!(reduce("[b]test[/b]", "[b]", "[/b]", &bold()), "[b]test[/b]");
        assert_eq!(reduce("a[b]b[/b]c", "[b]", "[/b]", &bold()), "[b]abc[/b]");
    }

    #[test]
    fn different_kind_is_untouched() {
        assert_eq!(reduce("[i]x[/i]", "[b]", "[/b]", &bold()), "[b][i]x[/i][/b]");
    }

    #[test]
    fn empty_pair_is_deleted() {
        assert_eq!(reduce("", "[b]", "[/b]", &bold()), "");
        assert_eq!(reduce("[b][/b]", "[b]", "[/b]", &bold()), "");
    }

    #[test]
    fn parameterized_markers_count_as_same_kind() {
        assert_eq!(
            reduce("[color=blue]x[/color]", "[color=red]", "[/color]", &color()),
            "[color=red]x[/color]"
        );
    }

    #[rstest]
    #[case("test")]
    #[case("[b]test[/b]")]
    #[case("a[b]b[/b]c")]
    #[case("[i][b]x[/b][/i]")]
    #[case("")]
    fn idempotent(#[case] content: &str) {
        let reducer = bold();
        let once = reduce(content, "[b]", "[/b]", &reducer);
        let twice = reduce(&once, "[b]", "[/b]", &reducer);
        assert_eq!(once, twice);
    }
}
