//! Minimal PDF writer.
//!
//! Lays the text of line-oriented markup onto PDF 1.4 pages using the base-14
//! Helvetica fonts, so no font files are embedded. The page setup comes from
//! [`PageConfig`] and never from the document being compiled.
//!
//! Output is deterministic: no creation date or document id is written, so
//! identical markup always compiles to identical bytes.

use bytes::Bytes;

use super::{DocumentCompiler, RenderError};

/// Fixed page and type setup.
#[derive(Debug, Clone, PartialEq)]
pub struct PageConfig {
    pub width_pt: f64,
    pub height_pt: f64,
    pub margin_pt: f64,
    pub font_regular: &'static str,
    pub font_bold: &'static str,
    pub body_size: f64,
    pub heading_size: f64,
    pub subheading_size: f64,
    /// Baseline distance as a multiple of the font size.
    pub leading: f64,
}

impl PageConfig {
    /// US Letter with 0.75in margins, Helvetica 10pt.
    pub fn letter() -> Self {
        Self {
            width_pt: 612.0,
            height_pt: 792.0,
            margin_pt: 54.0,
            font_regular: "Helvetica",
            font_bold: "Helvetica-Bold",
            body_size: 10.0,
            heading_size: 18.0,
            subheading_size: 13.0,
            leading: 1.4,
        }
    }

    fn text_width(&self) -> f64 {
        self.width_pt - 2.0 * self.margin_pt
    }

    /// Characters that fit on one line at `size`, assuming an average
    /// Helvetica glyph of half an em.
    fn chars_per_line(&self, size: f64) -> usize {
        ((self.text_width() / (size * 0.5)).floor() as usize).max(1)
    }
}

impl Default for PageConfig {
    fn default() -> Self {
        Self::letter()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Style {
    Heading,
    Subheading,
    Body,
}

#[derive(Debug, Clone, PartialEq)]
enum Block {
    Text(Style, String),
    Gap,
}

#[derive(Debug, Clone, PartialEq)]
struct PlacedLine {
    style: Style,
    x: f64,
    y: f64,
    text: String,
}

/// [`DocumentCompiler`] producing PDF bytes.
#[derive(Debug, Clone, Default)]
pub struct PdfCompiler {
    page: PageConfig,
}

impl PdfCompiler {
    pub fn new(page: PageConfig) -> Self {
        Self { page }
    }

    pub fn page_config(&self) -> &PageConfig {
        &self.page
    }

    fn size_of(&self, style: Style) -> f64 {
        match style {
            Style::Heading => self.page.heading_size,
            Style::Subheading => self.page.subheading_size,
            Style::Body => self.page.body_size,
        }
    }

    fn paginate(&self, blocks: &[Block]) -> Vec<Vec<PlacedLine>> {
        let page = &self.page;
        let top = page.height_pt - page.margin_pt;
        let bottom = page.margin_pt;

        let mut pages = vec![Vec::new()];
        let mut y = top;

        for block in blocks {
            match block {
                Block::Gap => {
                    let on_fresh_page = pages.last().map_or(true, |p| p.is_empty());
                    if !on_fresh_page {
                        y -= page.body_size * page.leading * 0.5;
                    }
                }
                Block::Text(style, text) => {
                    let size = self.size_of(*style);
                    for line in wrap(text, page.chars_per_line(size)) {
                        let advance = size * page.leading;
                        if y - advance < bottom {
                            pages.push(Vec::new());
                            y = top;
                        }
                        y -= advance;
                        if let Some(current) = pages.last_mut() {
                            current.push(PlacedLine {
                                style: *style,
                                x: page.margin_pt,
                                y,
                                text: line,
                            });
                        }
                    }
                }
            }
        }
        pages
    }

    fn content_stream(&self, lines: &[PlacedLine], page_no: usize, page_count: usize) -> String {
        let mut stream = String::new();
        for line in lines {
            let font = match line.style {
                Style::Body => "F1",
                Style::Heading | Style::Subheading => "F2",
            };
            stream.push_str(&format!(
                "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
                font,
                self.size_of(line.style),
                line.x,
                line.y,
                pdf_string(&line.text)
            ));
        }
        let footer = format!("Page {} of {}", page_no, page_count);
        stream.push_str(&format!(
            "BT /F1 {:.1} Tf {:.2} {:.2} Td ({}) Tj ET\n",
            self.page.body_size * 0.8,
            self.page.margin_pt,
            self.page.margin_pt * 0.5,
            pdf_string(&footer)
        ));
        stream
    }

    fn write_document(&self, pages: &[Vec<PlacedLine>]) -> Vec<u8> {
        let mut doc = PdfWriter::new();
        let page_count = pages.len();
        // 1 catalog, 2 page tree, 3 and 4 fonts, then a page/content pair per page.
        let page_ids: Vec<usize> = (0..page_count).map(|i| 5 + 2 * i).collect();

        doc.object(1, "<< /Type /Catalog /Pages 2 0 R >>");
        let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();
        doc.object(
            2,
            &format!(
                "<< /Type /Pages /Kids [{}] /Count {} >>",
                kids.join(" "),
                page_count
            ),
        );
        doc.object(3, &font_dict(self.page.font_regular));
        doc.object(4, &font_dict(self.page.font_bold));

        for (index, lines) in pages.iter().enumerate() {
            let page_id = page_ids[index];
            let content_id = page_id + 1;
            doc.object(
                page_id,
                &format!(
                    "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {:.0} {:.0}] \
                     /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                    self.page.width_pt, self.page.height_pt, content_id
                ),
            );
            let stream = self.content_stream(lines, index + 1, page_count);
            doc.stream(content_id, &stream);
        }

        doc.finish(1)
    }
}

impl DocumentCompiler for PdfCompiler {
    fn compile(&self, markup: &str) -> Result<Bytes, RenderError> {
        let blocks = parse_blocks(markup);
        if !blocks.iter().any(|b| matches!(b, Block::Text(..))) {
            return Err(RenderError::Compile("document has no content".into()));
        }
        let pages = self.paginate(&blocks);
        Ok(Bytes::from(self.write_document(&pages)))
    }
}

// ============================================================================
// MARKUP
// ============================================================================

fn parse_blocks(markup: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    for raw in markup.lines() {
        let line = raw.trim();
        let lower = line.to_ascii_lowercase();
        if lower.starts_with("<hr") {
            blocks.push(Block::Gap);
            continue;
        }
        let style = if lower.starts_with("<h1") {
            Style::Heading
        } else if lower.starts_with("<h2") || lower.starts_with("<h3") {
            Style::Subheading
        } else {
            Style::Body
        };
        let text = text_of(line);
        if text.is_empty() {
            continue;
        }
        if style != Style::Body {
            blocks.push(Block::Gap);
        }
        blocks.push(Block::Text(style, text));
    }
    blocks
}

/// Visible text of one markup line. Header cells are followed by ": ".
fn text_of(line: &str) -> String {
    let line = line.replace("</th>", ": ").replace("</td>", " ");
    let mut text = String::with_capacity(line.len());
    let mut in_tag = false;
    for c in line.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => text.push(c),
            _ => {}
        }
    }
    let text = unescape(&text);
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let word: String = word.into_iter().collect();
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

// ============================================================================
// PDF SERIALISATION
// ============================================================================

/// Escape text for a PDF literal string. Characters outside printable ASCII
/// are replaced, since the standard fonts only cover a Latin-1 subset.
fn pdf_string(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '(' => out.push_str("\\("),
            ')' => out.push_str("\\)"),
            ' '..='~' => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

fn font_dict(base_font: &str) -> String {
    format!(
        "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
        base_font
    )
}

struct PdfWriter {
    buf: Vec<u8>,
    offsets: Vec<(usize, usize)>,
}

impl PdfWriter {
    fn new() -> Self {
        let mut buf = Vec::new();
        buf.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");
        Self {
            buf,
            offsets: Vec::new(),
        }
    }

    fn object(&mut self, id: usize, body: &str) {
        self.offsets.push((id, self.buf.len()));
        self.buf
            .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", id, body).as_bytes());
    }

    fn stream(&mut self, id: usize, content: &str) {
        self.offsets.push((id, self.buf.len()));
        self.buf.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Length {} >>\nstream\n{}endstream\nendobj\n",
                id,
                content.len(),
                content
            )
            .as_bytes(),
        );
    }

    fn finish(mut self, root: usize) -> Vec<u8> {
        self.offsets.sort_unstable();
        let size = self.offsets.last().map_or(0, |(id, _)| *id) + 1;
        let xref_at = self.buf.len();

        let mut xref = format!("xref\n0 {}\n0000000000 65535 f \n", size);
        let mut next = 1;
        for (id, offset) in &self.offsets {
            // Unused ids are listed as free entries.
            while next < *id {
                xref.push_str("0000000000 65535 f \n");
                next += 1;
            }
            xref.push_str(&format!("{:010} 00000 n \n", offset));
            next = id + 1;
        }
        xref.push_str(&format!(
            "trailer\n<< /Size {} /Root {} 0 R >>\nstartxref\n{}\n%%EOF\n",
            size, root, xref_at
        ));
        self.buf.extend_from_slice(xref.as_bytes());
        self.buf
    }
}
