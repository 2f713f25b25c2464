use vcs_log_core::Highlight;
use vcs_log_graph::GraphSnapshot;
use vcs_log_graph::Row;

/// One line per row: marker, short hash, author and subject. Collapsed
/// merges report how many commits they fold.
pub(crate) fn format_row(snapshot: &GraphSnapshot, row: &Row, highlights: &[Highlight]) -> String {
    let marker = if row.collapsed {
        '+'
    } else if row.is_merge {
        'M'
    } else {
        '*'
    };
    let mine = if highlights.contains(&Highlight::MyCommit) {
        " (me)"
    } else {
        ""
    };
    let Some(node) = snapshot.commit(row.index) else {
        return format!("{marker} {}", row.commit.hash.short());
    };
    let mut line = format!(
        "{marker} {} {}{mine} {}",
        node.id.hash.short(),
        node.author.name,
        node.subject
    );
    if row.collapsed {
        line.push_str(&format!(" [{} hidden]", row.hidden_commits));
    }
    line
}
