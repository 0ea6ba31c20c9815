//! Normalization of demangled signatures.
//!
//! Demanglers from different toolchain vintages spell the same signature in
//! slightly different ways (`std::__cxx11::` vs `std::`, `> >` vs `>>`,
//! `char const*` vs `char const *`). Both the catalog and user queries go
//! through the same formatter so that equivalent signatures compare equal as
//! plain strings. Every transform here is idempotent.

/// Format a signature with the variant matching the host toolchain.
#[cfg(all(windows, target_env = "msvc"))]
pub fn format_signature(signature: &str) -> String {
    format_msvc_signature(signature)
}

/// Format a signature with the variant matching the host toolchain.
#[cfg(not(all(windows, target_env = "msvc")))]
pub fn format_signature(signature: &str) -> String {
    format_gnu_signature(signature)
}

/// Normalize output of an Itanium-ABI demangler (gcc, clang, MinGW).
pub fn format_gnu_signature(signature: &str) -> String {
    let out = strip_abi_tags(signature);
    let out = replace_all_until_stable(out, &GNU_INLINE_NAMESPACES);
    let out = expand_empty_params(&out);
    let out = replace_until_stable(out, "> >", ">>");
    let out = space_before(&out, '*');
    space_before(&out, '&')
}

/// Inline namespaces of libc++ and libstdc++, collapsed into plain `std::`.
const GNU_INLINE_NAMESPACES: [(&str, &str); 2] =
    [("std::__1::", "std::"), ("std::__cxx11::", "std::")];

/// `class `/`struct ` prefixes the MSVC undecorator emits before type names.
const MSVC_TYPE_KEYWORDS: [(&str, &str); 6] = [
    ("(class ", "("),
    ("<class ", "<"),
    (", class ", ", "),
    ("(struct ", "("),
    ("<struct ", "<"),
    (", struct ", ", "),
];

/// Normalize output of the MSVC undecorator.
pub fn format_msvc_signature(signature: &str) -> String {
    let mut out = replace_all_until_stable(normalize_commas(signature), &MSVC_TYPE_KEYWORDS);
    out = replace_until_stable(out, "> >", ">>");
    replace_until_stable(out, ">const", "> const")
}

/// Every replacement shortens the string, so this terminates.
fn replace_all_until_stable(mut s: String, pairs: &[(&str, &str)]) -> String {
    loop {
        let before = s.len();
        for (from, to) in pairs {
            s = s.replace(from, to);
        }
        if s.len() == before {
            return s;
        }
    }
}

fn replace_until_stable(mut s: String, from: &str, to: &str) -> String {
    while s.contains(from) {
        s = s.replace(from, to);
    }
    s
}

/// Drop `[abi:...]` tags; they vary across libstdc++/libc++ releases.
fn strip_abi_tags(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len());
    let mut rest = signature;
    while let Some(start) = rest.find("[abi:") {
        out.push_str(&rest[..start]);
        match rest[start..].find(']') {
            Some(end) => rest = &rest[start + end + 1..],
            None => {
                rest = &rest[start..];
                break;
            }
        }
    }
    out.push_str(rest);
    out
}

/// `foo()` becomes `foo(void)`; the call operator keeps its name.
fn expand_empty_params(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len() + 8);
    let mut rest = signature;
    while let Some(pos) = rest.find("()") {
        out.push_str(&rest[..pos]);
        if ends_with_operator_keyword(&out) {
            out.push_str("()");
        } else {
            out.push_str("(void)");
        }
        rest = &rest[pos + 2..];
    }
    out.push_str(rest);
    out
}

/// `operator` as a whole identifier, not the tail of `apply_operator`.
fn ends_with_operator_keyword(s: &str) -> bool {
    match s.strip_suffix("operator") {
        Some(head) => !head.ends_with(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        None => false,
    }
}

fn space_before(signature: &str, token: char) -> String {
    let mut out = String::with_capacity(signature.len() + 8);
    for ch in signature.chars() {
        if ch == token {
            if let Some(prev) = out.chars().next_back() {
                if !(prev.is_whitespace() || matches!(prev, '*' | '&' | '(')) {
                    out.push(' ');
                }
            }
        }
        out.push(ch);
    }
    out
}

fn normalize_commas(signature: &str) -> String {
    let mut out = String::with_capacity(signature.len() + 8);
    let mut chars = signature.chars().peekable();
    while let Some(ch) = chars.next() {
        out.push(ch);
        if ch == ',' {
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            out.push(' ');
        }
    }
    out
}
