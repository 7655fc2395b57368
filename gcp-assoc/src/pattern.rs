//! Compact alternation patterns for sets of related filenames.

/// Compresses an ordered set of filenames into one alternation pattern.
///
/// Every name is compared against the first: the longest prefix and suffix
/// shared with all of them are factored out and the remaining middles joined
/// with `|`, so `IMG_0001.jpg`/`IMG_0002.jpg` becomes `IMG_000(1|2).jpg`.
/// The shared suffix is clamped so it can never reach back past the shared
/// prefix within the shortest name; identical names therefore produce one
/// empty branch each (`x.jpg(|)`) instead of a corrupt pattern, and names
/// with nothing in common degrade to a raw alternation `(a|b)`.
///
/// This is a compression heuristic, not a minimal-regex construction: only
/// one prefix and one suffix relative to the first name are factored.
pub fn compress(names: &[String]) -> String {
    let first = match names.split_first() {
        None => return String::new(),
        Some((first, [])) => return first.clone(),
        Some((first, _)) => first,
    };

    let first_bytes = first.as_bytes();
    let mut prefix = first_bytes.len();
    let mut suffix = first_bytes.len();
    let mut shortest = first_bytes.len();
    for name in &names[1..] {
        let bytes = name.as_bytes();
        shortest = shortest.min(bytes.len());
        prefix = prefix.min(common_prefix(first_bytes, bytes));
        suffix = suffix.min(common_suffix(first_bytes, bytes));
    }
    // Keep the factored parts disjoint in every name.
    suffix = suffix.min(shortest - prefix.min(shortest));
    // The shared bytes are identical across names, so a char boundary found
    // on the first name is a boundary in all of them.
    while !first.is_char_boundary(prefix) {
        prefix -= 1;
    }
    while !first.is_char_boundary(first.len() - suffix) {
        suffix -= 1;
    }

    let mut pattern = String::with_capacity(first.len() + names.len() * 4);
    pattern.push_str(&first[..prefix]);
    pattern.push('(');
    for (index, name) in names.iter().enumerate() {
        if index > 0 {
            pattern.push('|');
        }
        pattern.push_str(&name[prefix..name.len() - suffix]);
    }
    pattern.push(')');
    pattern.push_str(&first[first.len() - suffix..]);
    pattern
}

fn common_prefix(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[u8], b: &[u8]) -> usize {
    a.iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count()
}
