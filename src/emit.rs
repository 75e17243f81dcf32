//! Rendering a blob as Rust source.
//!
//! The generated file declares a single [`Embedded`](crate::Embedded) static
//! and nothing else:
//!
//! ```text
//! // Code generated by brfs. DO NOT EDIT.
//!
//! #[allow(non_upper_case_globals)]
//! pub static br: ::brfs::Embedded = ::brfs::Embedded::new(include_bytes!("public.brfs"));
//! ```

const HEADER: &str = "// Code generated by brfs. DO NOT EDIT.\n";
// Bytes per line of an inlined literal.
const LINE_BYTES: usize = 32;

/// Renders generated source for one static.
#[derive(Clone, Debug)]
pub struct Emitter<'a> {
    variable: &'a str,
    crate_path: &'a str,
}

impl<'a> Emitter<'a> {
    /// `variable` must already be a valid identifier.
    pub fn new(variable: &'a str) -> Self {
        Self {
            variable,
            crate_path: "::brfs",
        }
    }

    /// Path the generated code uses to reach this crate, `::brfs` by default.
    #[must_use]
    pub fn crate_path(mut self, crate_path: &'a str) -> Self {
        self.crate_path = crate_path;
        self
    }

    /// Reference a blob stored next to the generated file.
    pub fn render_include(&self, blob_file: &str) -> String {
        self.render(&format!("include_bytes!({blob_file:?})"))
    }

    /// Embed the blob itself as a byte-string literal.
    pub fn render_inline(&self, blob: &[u8]) -> String {
        let mut literal = String::with_capacity(blob.len() * 2 + 16);
        literal.push_str("b\"\\\n");
        for line in blob.chunks(LINE_BYTES) {
            literal.push_str("    ");
            for &byte in line {
                // A line continuation swallows leading whitespace.
                if byte == b' ' {
                    literal.push_str("\\x20");
                } else {
                    literal.extend(std::ascii::escape_default(byte).map(char::from));
                }
            }
            literal.push_str("\\\n");
        }
        literal.push('"');
        self.render(&literal)
    }

    fn render(&self, blob_expr: &str) -> String {
        let krate = self.crate_path;
        format!(
            "{HEADER}\n\
             #[allow(non_upper_case_globals)]\n\
             pub static {var}: {krate}::Embedded = {krate}::Embedded::new({blob_expr});\n",
            var = self.variable,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn include_form() {
        let code = Emitter::new("br").render_include("public.brfs");
        assert_eq!(
            code,
            "// Code generated by brfs. DO NOT EDIT.\n\n\
             #[allow(non_upper_case_globals)]\n\
             pub static br: ::brfs::Embedded = ::brfs::Embedded::new(include_bytes!(\"public.brfs\"));\n"
        );
    }

    #[test]
    fn inline_form_escapes_bytes() {
        let code = Emitter::new("ASSETS")
            .crate_path("crate")
            .render_inline(b"BR\"\\\n\x00\xff");
        assert!(code.contains("pub static ASSETS: crate::Embedded = crate::Embedded::new(b\"\\\n"));
        assert!(code.contains("    BR\\\"\\\\\\n\\x00\\xff\\\n\""), "{code}");
    }

    // The byte string the compiler would see in the generated source.
    fn compiled_literal(code: &str) -> Vec<u8> {
        let start = code.find("b\"").unwrap();
        let end = code.rfind(')').unwrap();
        syn::parse_str::<syn::LitByteStr>(&code[start..end])
            .unwrap()
            .value()
    }

    #[test]
    fn inline_literal_keeps_every_byte() {
        let mut blob = vec![b'x'; LINE_BYTES];
        blob.extend_from_slice(b" y");
        blob.extend_from_slice(b"\t\r\n\x0b\x0c  ");
        blob.extend((0..=255u8).rev());
        let code = Emitter::new("br").render_inline(&blob);
        assert_eq!(compiled_literal(&code), blob);

        let leading = b"  starts with spaces";
        let code = Emitter::new("br").render_inline(leading);
        assert_eq!(compiled_literal(&code), leading);
    }

    #[test]
    fn inline_lines_are_bounded() {
        let code = Emitter::new("br").render_inline(&[b'a'; 100]);
        let body: Vec<_> = code.lines().filter(|l| l.starts_with("    a")).collect();
        assert_eq!(body.len(), 4);
        assert!(body.iter().all(|l| l.len() <= LINE_BYTES + 5));
    }
}
