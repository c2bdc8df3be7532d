//! Call-tree reassembly
//!
//! The tracing backend returns spans as a flat list in arbitrary order. This
//! crate reorders them into a pre-order, depth-first sequence suitable for
//! display: every span's index precedes all of its descendants', siblings are
//! ascending by timestamp, and each span carries its nesting `level`.
//!
//! The implementation keeps a mutable pool of not-yet-placed spans and splices
//! each one into a growing result sequence right after its parent. O(n²) by
//! construction; traces are tens to low hundreds of spans.

use stitch_core::Span;
use tracing::debug;

/// Reorder a flat span list into a depth-ordered, parent-contiguous sequence,
/// assigning each span its nesting level (top level is 0).
///
/// Spans whose parent id never appears in the list are never placed: a
/// truncated trace loses its dangling branches rather than failing.
pub fn reassemble(spans: Vec<Span>) -> Vec<Span> {
    let total = spans.len();
    let mut pool = spans;
    let mut results: Vec<Span> = Vec::new();

    place_children(&mut results, &mut pool, None, 0);

    if !pool.is_empty() {
        debug!(
            "Dropped {} of {} spans with dangling parent references",
            pool.len(),
            total
        );
    }

    results
}

/// Place every pool span whose parent is `parent_id`, then recurse into each
/// placed span as the new parent one level deeper.
fn place_children(
    results: &mut Vec<Span>,
    pool: &mut Vec<Span>,
    parent_id: Option<&str>,
    level: u32,
) {
    // Select matching spans in pool order; the pool is not pre-sorted.
    let mut selected: Vec<Span> = Vec::new();
    let mut i = 0;
    while i < pool.len() {
        if pool[i].parent_span_id.as_deref() == parent_id {
            selected.push(pool.remove(i));
        } else {
            i += 1;
        }
    }

    let mut placed_ids: Vec<Option<String>> = Vec::with_capacity(selected.len());
    for mut span in selected {
        span.level = level;
        placed_ids.push(span.span_id.clone());

        if results.is_empty() {
            // Only the very first span placed lands here.
            results.push(span);
            continue;
        }

        // Insertion point: immediately after the parent, advanced past any
        // already-placed siblings that started earlier.
        let mut to = match parent_id {
            Some(pid) => results
                .iter()
                .position(|s| s.span_id.as_deref() == Some(pid))
                .map(|idx| idx + 1)
                .unwrap_or(0),
            None => 0,
        };
        while to < results.len()
            && results[to].parent_span_id.as_deref() == span.parent_span_id.as_deref()
            && results[to].timestamp < span.timestamp
        {
            to += 1;
        }
        results.insert(to, span);
    }

    for id in placed_ids {
        // A span without an id cannot be referenced as a parent.
        if let Some(id) = id {
            place_children(results, pool, Some(id.as_str()), level + 1);
        }
    }
}
