//! Glob-style pattern matching and nucleotide codes.

/// Bitmasks for the four bases, indexed by letter for the IUPAC degenerate
/// codes. `N` is all four; letters with no meaning map to 0.
static DEGENERATE_NT: [u8; 26] = [
    /*A*/ 1,
    /*B*/ 2 | 4 | 8,
    /*C*/ 2,
    /*D*/ 1 | 4 | 8,
    /*E*/ 0,
    /*F*/ 0,
    /*G*/ 4,
    /*H*/ 1 | 2 | 8,
    /*I*/ 0,
    /*J*/ 0,
    /*K*/ 4 | 8,
    /*L*/ 0,
    /*M*/ 1 | 2,
    /*N*/ 1 | 2 | 4 | 8,
    /*O*/ 0,
    /*P*/ 0,
    /*Q*/ 0,
    /*R*/ 1 | 4,
    /*S*/ 2 | 4,
    /*T*/ 8,
    /*U*/ 8,
    /*V*/ 1 | 2 | 4,
    /*W*/ 1 | 8,
    /*X*/ 1 | 2 | 4 | 8,
    /*Y*/ 2 | 8,
    /*Z*/ 0,
];

/// Degenerate base bitmask for a nucleotide letter, case-insensitive.
pub fn nucleotide_code(c: u8) -> u8 {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        DEGENERATE_NT[(c - b'a') as usize]
    } else {
        0
    }
}

/// Case-insensitive glob matching: `*` matches any run of characters
/// (including none), `?` matches exactly one, anything else matches itself.
///
/// A `*` first tries consuming nothing and grows on failure, recursively
/// retrying the rest of the pattern against each successive input suffix.
pub fn globish_match(pattern: impl AsRef<[u8]>, input: impl AsRef<[u8]>) -> bool {
    match_suffix(pattern.as_ref(), input.as_ref())
}

fn match_suffix(pattern: &[u8], input: &[u8]) -> bool {
    let mut p = 0;
    let mut i = 0;
    while p < pattern.len() {
        match pattern[p] {
            b'?' => {
                if i >= input.len() {
                    return false;
                }
                i += 1;
                p += 1;
            }
            b'*' => {
                // collapse runs of stars
                while p + 1 < pattern.len() && pattern[p + 1] == b'*' {
                    p += 1;
                }
                if p + 1 == pattern.len() {
                    return true;
                }
                for start in i..=input.len() {
                    if match_suffix(&pattern[p + 1..], &input[start..]) {
                        return true;
                    }
                }
                return false;
            }
            c => {
                if i >= input.len() || !c.eq_ignore_ascii_case(&input[i]) {
                    return false;
                }
                i += 1;
                p += 1;
            }
        }
    }
    i == input.len()
}
