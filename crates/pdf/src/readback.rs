//! Text recovered from written PDFs, as a viewer would extract it.

use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static OBJECT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)(\d+) 0 obj\n(.*?)\nendobj").unwrap());
static FONT_RESOURCE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/(F\d+) (\d+) 0 R").unwrap());
static TO_UNICODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/ToUnicode (\d+) 0 R").unwrap());
static BFCHAR_BLOCK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)beginbfchar\n(.*?)endbfchar").unwrap());
static BFCHAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([0-9A-F]{4})> <([0-9A-F]+)>").unwrap());
static CONTENTS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/Type /Page .*/Contents (\d+) 0 R").unwrap());
static TEXT_OP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"BT |1 0 ([\d.]+) 1 [-\d.]+ [-\d.]+ Tm|/(F\d+) ([\d.]+) Tf|<([0-9A-F]*)> Tj|ET\n")
        .unwrap()
});

/// One `BT`..`ET` block.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextBlock {
    pub text: String,
    /// Font resources in drawing order.
    pub fonts: Vec<String>,
    pub size: f32,
    pub italic: bool,
}

fn hex_units(hex: &str) -> Vec<u16> {
    (0..hex.len() / 4)
        .map(|i| u16::from_str_radix(&hex[i * 4..i * 4 + 4], 16).unwrap())
        .collect()
}

/// Code-to-text maps keyed by font resource name.
fn code_maps(objects: &HashMap<usize, &str>) -> HashMap<String, HashMap<u16, String>> {
    let mut maps = HashMap::new();
    let Some(page) = objects.values().find(|body| body.contains("/Type /Page ")) else {
        return maps;
    };
    for resource in FONT_RESOURCE_REGEX.captures_iter(page) {
        let font_id: usize = resource[2].parse().unwrap();
        let Some(to_unicode) = TO_UNICODE_REGEX.captures(objects[&font_id]) else {
            continue;
        };
        let cmap_id: usize = to_unicode[1].parse().unwrap();
        let mut map = HashMap::new();
        for block in BFCHAR_BLOCK_REGEX.captures_iter(objects[&cmap_id]) {
            for entry in BFCHAR_REGEX.captures_iter(&block[1]) {
                let code = u16::from_str_radix(&entry[1], 16).unwrap();
                let text = char::decode_utf16(hex_units(&entry[2]))
                    .map(|c| c.unwrap())
                    .collect();
                map.insert(code, text);
            }
        }
        maps.insert(resource[1].to_string(), map);
    }
    maps
}

/// Every text block in drawing order.
pub fn text_blocks(pdf: &[u8]) -> Vec<TextBlock> {
    let text = String::from_utf8_lossy(pdf);
    let objects: HashMap<usize, &str> = OBJECT_REGEX
        .captures_iter(&text)
        .map(|c| {
            let body = c.get(2).unwrap().as_str();
            (c[1].parse().unwrap(), body)
        })
        .collect();
    let maps = code_maps(&objects);

    let mut contents: Vec<usize> = objects
        .values()
        .filter_map(|body| CONTENTS_REGEX.captures(body))
        .map(|c| c[1].parse().unwrap())
        .collect();
    contents.sort_unstable();

    let mut blocks = Vec::new();
    for id in contents {
        let body = objects[&id];
        let mut block = TextBlock::default();
        let mut font = String::new();
        for op in TEXT_OP_REGEX.captures_iter(body) {
            if let Some(skew) = op.get(1) {
                block.italic = skew.as_str().parse::<f32>().unwrap() != 0.0;
            } else if let Some(resource) = op.get(2) {
                font = resource.as_str().to_string();
                block.fonts.push(font.clone());
                block.size = op[3].parse().unwrap();
            } else if let Some(hex) = op.get(4) {
                for code in hex_units(hex.as_str()) {
                    block.text.push_str(&maps[&font][&code]);
                }
            } else if op[0].starts_with("ET") {
                blocks.push(std::mem::take(&mut block));
            }
        }
    }
    blocks
}

/// The text of every block in drawing order.
pub fn shown_text(pdf: &[u8]) -> Vec<String> {
    text_blocks(pdf).into_iter().map(|b| b.text).collect()
}
