//! JVM-style type descriptor rewriting.
//!
//! Descriptors are otherwise carried opaquely; the only operation needed is
//! replacing each class reference (`L<name>;`) through a class-name mapping,
//! e.g. `(La;I)Lb;` with `a → foo` becomes `(Lfoo;I)Lb;` when `b` is unmapped.

/// Rewrite every class reference in `desc` through `map`.
///
/// Class names that `map` does not know are kept as they are. Malformed
/// input (an `L` without a terminating `;`) is copied through unchanged.
pub fn remap_descriptor<'a, F>(desc: &str, map: F) -> String
where
    F: Fn(&str) -> Option<&'a str>,
{
    let mut out = String::with_capacity(desc.len());
    let mut rest = desc;

    while let Some(start) = rest.find('L') {
        out.push_str(&rest[..=start]);
        let after = &rest[start + 1..];
        match after.find(';') {
            Some(end) => {
                let class = &after[..end];
                out.push_str(map(class).unwrap_or(class));
                out.push(';');
                rest = &after[end + 1..];
            }
            None => {
                rest = after;
                break;
            }
        }
    }

    out.push_str(rest);
    out
}

/// Returns true if `desc` references any class at all.
pub fn has_class_references(desc: &str) -> bool {
    desc.contains('L') && desc.contains(';')
}
