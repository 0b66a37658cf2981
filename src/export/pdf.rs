//! Minimal PDF 1.4 writer for plain text.
//!
//! Text is set in the Hack monospace face, embedded whole as a `CIDFontType2` font with
//! `Identity-H` encoding. The content streams hold glyph ids and a `ToUnicode` CMap maps
//! them back to characters, so Cyrillic names survive copy and search. Characters the face
//! does not cover are drawn as the `.notdef` glyph. Lines longer than the page are not wrapped.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;
use std::path::Path;

use thiserror::Error;
use ttf_parser::{Face, FaceParsingError, GlyphId};

const PAGE_WIDTH: u32 = 595;
const PAGE_HEIGHT: u32 = 842;
const MARGIN: u32 = 50;
const FONT_SIZE: u32 = 11;
const LEADING: u32 = 14;
const TAB: &str = "    ";

const FONT_NAME: &str = "Hack-Regular";
const FONT_DATA: &[u8] = epaint_default_fonts::HACK_REGULAR;

// Fixed objects: catalog, page tree, Type0 font, CID font, ToUnicode, descriptor, font file.
const FIXED_OBJECTS: usize = 7;

/// Number of text lines that fit on one A4 page.
pub const LINES_PER_PAGE: usize = ((PAGE_HEIGHT - 2 * MARGIN) / LEADING) as usize;

#[derive(Debug, Error)]
pub enum PdfError {
    #[error("embedded font is unreadable: {0}")]
    Font(#[from] FaceParsingError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Renders `text` into a complete PDF document, one or more A4 pages long.
pub fn render_text_pdf(text: &str) -> Result<Vec<u8>, PdfError> {
    let font = TextFont::load(FONT_DATA)?;

    let expanded: Vec<String> = text.lines().map(|line| line.replace('\t', TAB)).collect();
    let lines: Vec<Vec<GlyphId>> = expanded.iter().map(|line| font.shape(line)).collect();
    let pages: Vec<&[Vec<GlyphId>]> = if lines.is_empty() {
        vec![&[][..]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };

    let page_id = |index: usize| FIXED_OBJECTS + 1 + 2 * index;
    let content_id = |index: usize| FIXED_OBJECTS + 2 + 2 * index;

    let mut objects: Vec<Vec<u8>> = Vec::with_capacity(FIXED_OBJECTS + 2 * pages.len());
    objects.push(b"<< /Type /Catalog /Pages 2 0 R >>".to_vec());

    let kids = (0..pages.len())
        .map(|index| format!("{} 0 R", page_id(index)))
        .collect::<Vec<_>>()
        .join(" ");
    objects.push(
        format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids,
            pages.len()
        )
        .into_bytes(),
    );

    let used = font.used_glyphs(expanded.iter().map(String::as_str));
    objects.push(
        format!(
            "<< /Type /Font /Subtype /Type0 /BaseFont /{} /Encoding /Identity-H \
             /DescendantFonts [4 0 R] /ToUnicode 5 0 R >>",
            FONT_NAME
        )
        .into_bytes(),
    );
    objects.push(font.cid_font(&used).into_bytes());
    objects.push(stream_object("", to_unicode_cmap(&used).as_bytes()));
    objects.push(font.descriptor().into_bytes());
    objects.push(stream_object(
        &format!("/Length1 {}", FONT_DATA.len()),
        FONT_DATA,
    ));

    for (index, page_lines) in pages.iter().enumerate() {
        objects.push(
            format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH,
                PAGE_HEIGHT,
                content_id(index)
            )
            .into_bytes(),
        );
        objects.push(stream_object("", content_stream(page_lines).as_bytes()));
    }

    Ok(assemble(&objects))
}

/// Renders `text` and writes the document to `path`.
pub fn write_text_pdf(path: &Path, text: &str) -> Result<(), PdfError> {
    std::fs::write(path, render_text_pdf(text)?)?;
    Ok(())
}

struct TextFont<'a> {
    face: Face<'a>,
}

impl<'a> TextFont<'a> {
    fn load(data: &'a [u8]) -> Result<Self, PdfError> {
        Ok(Self {
            face: Face::parse(data, 0)?,
        })
    }

    /// Font units to PDF glyph space (1000 per em).
    fn scale(&self, units: i32) -> i32 {
        units * 1000 / i32::from(self.face.units_per_em().max(1))
    }

    fn glyph(&self, ch: char) -> GlyphId {
        self.face.glyph_index(ch).unwrap_or(GlyphId(0))
    }

    fn shape(&self, line: &str) -> Vec<GlyphId> {
        line.chars().map(|ch| self.glyph(ch)).collect()
    }

    fn advance(&self, glyph: GlyphId) -> i32 {
        self.scale(i32::from(self.face.glyph_hor_advance(glyph).unwrap_or(0)))
    }

    /// Every drawn glyph with the character it stands for. `.notdef` is left out.
    fn used_glyphs<'s>(&self, lines: impl IntoIterator<Item = &'s str>) -> BTreeMap<u16, char> {
        let mut used = BTreeMap::new();
        for ch in lines.into_iter().flat_map(str::chars) {
            let glyph = self.glyph(ch);
            if glyph.0 != 0 {
                used.entry(glyph.0).or_insert(ch);
            }
        }
        used
    }

    fn cid_font(&self, used: &BTreeMap<u16, char>) -> String {
        let mut widths = String::new();
        for glyph in used.keys() {
            let _ = write!(widths, "{} [{}] ", glyph, self.advance(GlyphId(*glyph)));
        }
        format!(
            "<< /Type /Font /Subtype /CIDFontType2 /BaseFont /{} \
             /CIDSystemInfo << /Registry (Adobe) /Ordering (Identity) /Supplement 0 >> \
             /FontDescriptor 6 0 R /CIDToGIDMap /Identity /DW {} /W [{}] >>",
            FONT_NAME,
            self.advance(GlyphId(0)),
            widths.trim_end()
        )
    }

    fn descriptor(&self) -> String {
        let bbox = self.face.global_bounding_box();
        let ascent = self.scale(i32::from(self.face.ascender()));
        let cap_height = self
            .face
            .capital_height()
            .map(|height| self.scale(i32::from(height)))
            .unwrap_or(ascent);
        // flags: fixed pitch, nonsymbolic
        format!(
            "<< /Type /FontDescriptor /FontName /{} /Flags 33 /FontBBox [{} {} {} {}] \
             /ItalicAngle 0 /Ascent {} /Descent {} /CapHeight {} /StemV 80 /FontFile2 7 0 R >>",
            FONT_NAME,
            self.scale(i32::from(bbox.x_min)),
            self.scale(i32::from(bbox.y_min)),
            self.scale(i32::from(bbox.x_max)),
            self.scale(i32::from(bbox.y_max)),
            ascent,
            self.scale(i32::from(self.face.descender())),
            cap_height
        )
    }
}

fn to_unicode_cmap(used: &BTreeMap<u16, char>) -> String {
    let mut cmap = String::from(
        "/CIDInit /ProcSet findresource begin\n\
         12 dict begin\n\
         begincmap\n\
         /CIDSystemInfo << /Registry (Adobe) /Ordering (UCS) /Supplement 0 >> def\n\
         /CMapName /Adobe-Identity-UCS def\n\
         /CMapType 2 def\n\
         1 begincodespacerange\n<0000> <FFFF>\nendcodespacerange\n",
    );

    let entries: Vec<(&u16, &char)> = used.iter().collect();
    // at most 100 entries per bfchar block
    for block in entries.chunks(100) {
        let _ = writeln!(cmap, "{} beginbfchar", block.len());
        for (glyph, ch) in block {
            let mut units = [0u16; 2];
            let utf16: String = ch
                .encode_utf16(&mut units)
                .iter()
                .map(|unit| format!("{:04X}", unit))
                .collect();
            let _ = writeln!(cmap, "<{:04X}> <{}>", glyph, utf16);
        }
        cmap.push_str("endbfchar\n");
    }

    cmap.push_str("endcmap\nCMapName currentdict /CMap defineresource pop\nend\nend");
    cmap
}

fn content_stream(lines: &[Vec<GlyphId>]) -> String {
    let mut stream = format!(
        "BT\n/F1 {} Tf\n{} TL\n{} {} Td\n",
        FONT_SIZE,
        LEADING,
        MARGIN,
        PAGE_HEIGHT - MARGIN - FONT_SIZE
    );
    for (index, glyphs) in lines.iter().enumerate() {
        if index > 0 {
            stream.push_str("T*\n");
        }
        let _ = writeln!(stream, "{} Tj", hex_string(glyphs));
    }
    stream.push_str("ET");
    stream
}

/// Two-byte glyph ids as a PDF hex string.
fn hex_string(glyphs: &[GlyphId]) -> String {
    let mut hex = String::with_capacity(2 + 4 * glyphs.len());
    hex.push('<');
    for glyph in glyphs {
        let _ = write!(hex, "{:04X}", glyph.0);
    }
    hex.push('>');
    hex
}

fn stream_object(extra: &str, data: &[u8]) -> Vec<u8> {
    let mut object = if extra.is_empty() {
        format!("<< /Length {} >>\nstream\n", data.len())
    } else {
        format!("<< /Length {} {} >>\nstream\n", data.len(), extra)
    }
    .into_bytes();
    object.extend_from_slice(data);
    object.extend_from_slice(b"\nendstream");
    object
}

fn assemble(objects: &[Vec<u8>]) -> Vec<u8> {
    let mut out = b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n".to_vec();
    let mut offsets = Vec::with_capacity(objects.len());

    for (index, body) in objects.iter().enumerate() {
        offsets.push(out.len());
        out.extend_from_slice(format!("{} 0 obj\n", index + 1).as_bytes());
        out.extend_from_slice(body);
        out.extend_from_slice(b"\nendobj\n");
    }

    let xref_offset = out.len();
    let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
    for offset in offsets {
        let _ = writeln!(xref, "{:010} 00000 n ", offset);
    }
    let _ = write!(
        xref,
        "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
        objects.len() + 1,
        xref_offset
    );
    out.extend_from_slice(xref.as_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_text(pdf: &[u8]) -> String {
        String::from_utf8_lossy(pdf).into_owned()
    }

    fn startxref(pdf: &str) -> usize {
        let tail = pdf.rsplit("startxref\n").next().unwrap();
        tail.lines().next().unwrap().trim().parse().unwrap()
    }

    /// Reads the shown lines back through the document's ToUnicode map.
    fn shown_lines(pdf: &[u8]) -> Vec<String> {
        let text = as_text(pdf);
        let mut to_unicode = BTreeMap::new();
        let mut in_bfchar = false;
        let mut shown = Vec::new();

        for line in text.lines() {
            if line.ends_with("beginbfchar") {
                in_bfchar = true;
            } else if line == "endbfchar" {
                in_bfchar = false;
            } else if in_bfchar {
                let (glyph, unicode) = line.split_once(' ').unwrap();
                let glyph = u16::from_str_radix(glyph.trim_matches(&['<', '>'][..]), 16).unwrap();
                let unicode = unicode.trim_matches(&['<', '>'][..]);
                let units: Vec<u16> = (0..unicode.len())
                    .step_by(4)
                    .map(|at| u16::from_str_radix(&unicode[at..at + 4], 16).unwrap())
                    .collect();
                to_unicode.insert(glyph, String::from_utf16(&units).unwrap());
            } else if line.starts_with('<') && line.ends_with("> Tj") {
                shown.push(line.trim_end_matches(" Tj").trim_matches(&['<', '>'][..]).to_string());
            }
        }

        shown
            .iter()
            .map(|hex| {
                (0..hex.len())
                    .step_by(4)
                    .map(|at| {
                        let glyph = u16::from_str_radix(&hex[at..at + 4], 16).unwrap();
                        to_unicode.get(&glyph).cloned().unwrap_or_else(|| "?".into())
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn single_page_document_is_well_formed() {
        let pdf = render_text_pdf("Order ID: 1\nTotal: 15.00").unwrap();
        let text = as_text(&pdf);

        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/Count 1"));
        assert!(text.contains("/Subtype /Type0 /BaseFont /Hack-Regular /Encoding /Identity-H"));
        assert_eq!(shown_lines(&pdf), vec!["Order ID: 1", "Total: 15.00"]);

        let offset = startxref(&text);
        assert!(pdf[offset..].starts_with(b"xref"));
    }

    #[test]
    fn xref_offsets_point_at_objects() {
        let pdf = render_text_pdf("a\nb").unwrap();
        let text = as_text(&pdf);
        let xref_at = startxref(&text);
        let table = &pdf[xref_at..];
        let table = as_text(table);

        for (index, entry) in table.lines().skip(3).take(FIXED_OBJECTS + 2).enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            let header = format!("{} 0 obj", index + 1);
            assert!(pdf[offset..].starts_with(header.as_bytes()), "object {}", index + 1);
        }
    }

    #[test]
    fn long_text_spills_onto_more_pages() {
        let text = (0..LINES_PER_PAGE + 1)
            .map(|n| format!("line {}", n))
            .collect::<Vec<_>>()
            .join("\n");
        let pdf = render_text_pdf(&text).unwrap();
        let shown = shown_lines(&pdf);
        let pdf = as_text(&pdf);

        assert!(pdf.contains("/Count 2"));
        assert!(pdf.contains("/Kids [8 0 R 10 0 R]"));
        assert_eq!(shown.len(), LINES_PER_PAGE + 1);
        assert_eq!(shown.last().unwrap(), &format!("line {}", LINES_PER_PAGE));
    }

    #[test]
    fn cyrillic_text_is_kept() {
        let pdf = render_text_pdf("Заказ 1\nProduct: Корм Альфа (сухой)\ncafé\tёж").unwrap();
        assert_eq!(
            shown_lines(&pdf),
            vec!["Заказ 1", "Product: Корм Альфа (сухой)", "café    ёж"]
        );
    }

    #[test]
    fn glyph_widths_are_declared_for_used_glyphs_only() {
        let font = TextFont::load(FONT_DATA).unwrap();
        let used = font.used_glyphs(["ЖЖ", "a"]);
        assert_eq!(used.len(), 2);
        assert!(used.values().any(|ch| *ch == 'Ж'));

        let cid_font = font.cid_font(&used);
        let declared = cid_font.matches(" [").count();
        // one for each glyph, plus the /W array itself
        assert_eq!(declared, used.len() + 1);
    }

    #[test]
    fn empty_text_still_yields_a_page() {
        let pdf = render_text_pdf("").unwrap();
        assert!(as_text(&pdf).contains("/Count 1"));
        assert!(shown_lines(&pdf).is_empty());
    }

    #[test]
    fn writes_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order.pdf");
        write_text_pdf(&path, "hello").unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        assert_eq!(bytes, render_text_pdf("hello").unwrap());
    }
}
