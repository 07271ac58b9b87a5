//! Natural/alphanumeric ordering for bucket keys and item names.
//!
//! Compares digit runs by numeric value so "rom2" sorts before "rom10",
//! case-insensitively, with a raw-string tiebreak to keep the order total.

use std::cmp::Ordering;

/// Compare two strings in natural order.
///
/// Digit runs are compared as unsigned numbers (longer-after-leading-zeros
/// runs are larger; equal values fall through to the next segment), other
/// characters compare case-insensitively. Strings that read identically are
/// tie-broken by the raw comparison so the order is total and stable.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ca = a.chars().peekable();
    let mut cb = b.chars().peekable();

    loop {
        match (ca.peek().copied(), cb.peek().copied()) {
            (None, None) => break,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => {
                if x.is_ascii_digit() && y.is_ascii_digit() {
                    let run_a = take_digit_run(&mut ca);
                    let run_b = take_digit_run(&mut cb);
                    match compare_digit_runs(&run_a, &run_b) {
                        Ordering::Equal => continue,
                        other => return other,
                    }
                }

                let fx = x.to_ascii_lowercase();
                let fy = y.to_ascii_lowercase();
                match fx.cmp(&fy) {
                    Ordering::Equal => {
                        ca.next();
                        cb.next();
                    }
                    other => return other,
                }
            }
        }
    }

    // Case-insensitively equal; fall back to the raw bytes for stability.
    a.cmp(b)
}

fn take_digit_run(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

/// Compare two ASCII digit runs numerically without parsing to an integer
/// (runs in the wild can exceed u64).
fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    match a.len().cmp(&b.len()) {
        Ordering::Equal => a.cmp(b),
        other => other,
    }
}
