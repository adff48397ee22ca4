//! Plain-text rendering of difference lists.

use std::io::{self, Write};

use super::schema::Difference;

/// Render each difference behind its kind label, one block per difference
pub fn render_diffs(diffs: &[Difference]) -> String {
    diffs
        .iter()
        .map(|diff| format!("{}\n", diff))
        .collect()
}

/// Write the rendered differences to `out`
pub fn print_diffs<W: Write>(diffs: &[Difference], out: &mut W) -> io::Result<()> {
    out.write_all(render_diffs(diffs).as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_render_prefixes_each_kind() {
        let diffs = vec![
            Difference::tags("L   some: tag"),
            Difference::pixel_stats("data: min=1"),
            Difference::dataset("not close"),
        ];
        assert_eq!(
            render_diffs(&diffs),
            "Differences in meta data:\nL   some: tag\n\
             Differences in pixel data:\ndata: min=1\n\
             Differences in dataset:\nnot close\n"
        );
    }

    #[test]
    fn test_nothing_rendered_for_no_diffs() {
        let mut out = Vec::new();
        print_diffs(&[], &mut out).unwrap();
        assert!(out.is_empty());
    }
}
