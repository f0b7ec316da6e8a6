//! Crate file writer used to build test fixtures in memory.

#![allow(dead_code)]

use byteorder::{LittleEndian, WriteBytesExt};

pub const MAGIC: &[u8; 8] = b"PXR-USDC";
pub const HEADER_SIZE: u64 = 24;

/// Assembles a Crate file image: header, section payloads, then the TOC.
pub struct CrateBuilder {
    version: [u8; 3],
    body: Vec<u8>,
    sections: Vec<(String, u64, u64)>,
}

impl CrateBuilder {
    pub fn new() -> Self {
        Self {
            version: [0, 8, 0],
            body: Vec::new(),
            sections: Vec::new(),
        }
    }

    pub fn version(mut self, major: u8, minor: u8, patch: u8) -> Self {
        self.version = [major, minor, patch];
        self
    }

    /// Append a section payload and record it in the TOC.
    pub fn section(mut self, name: &str, payload: Vec<u8>) -> Self {
        let start = HEADER_SIZE + self.body.len() as u64;
        self.body.extend_from_slice(&payload);
        let end = HEADER_SIZE + self.body.len() as u64;
        self.sections.push((name.to_string(), start, end));
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let toc_offset = HEADER_SIZE + self.body.len() as u64;

        let mut data = Vec::new();
        data.extend_from_slice(MAGIC);
        data.extend_from_slice(&self.version);
        data.extend_from_slice(&[0u8; 5]);
        data.write_u64::<LittleEndian>(toc_offset).unwrap();
        data.extend_from_slice(&self.body);

        data.write_u64::<LittleEndian>(self.sections.len() as u64).unwrap();
        for (name, start, end) in &self.sections {
            let mut raw = [0u8; 16];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            data.extend_from_slice(&raw);
            data.write_u64::<LittleEndian>(*start).unwrap();
            data.write_u64::<LittleEndian>(*end).unwrap();
        }
        data
    }
}

/// Single-chunk frame: chunk-count byte 0 then a raw LZ4 block.
pub fn frame(data: &[u8]) -> Vec<u8> {
    frame_with_chunks(data, 0)
}

pub fn frame_with_chunks(data: &[u8], chunks: u8) -> Vec<u8> {
    let mut out = vec![chunks];
    out.extend_from_slice(&lz4_flex::block::compress(data));
    out
}

/// Integer coding with a zero common value and full-width deltas.
fn encode_ints(values: &[i64], wide: bool) -> Vec<u8> {
    let mut out = Vec::new();
    if wide {
        out.write_i64::<LittleEndian>(0).unwrap();
    } else {
        out.write_i32::<LittleEndian>(0).unwrap();
    }
    // Code 3 in every slot.
    out.extend(std::iter::repeat(0xFFu8).take(values.len().div_ceil(4)));

    let mut prev = 0i64;
    for &value in values {
        if wide {
            out.write_i64::<LittleEndian>(value.wrapping_sub(prev)).unwrap();
        } else {
            let delta = (value as i32).wrapping_sub(prev as i32);
            out.write_i32::<LittleEndian>(delta).unwrap();
        }
        prev = value;
    }
    out
}

fn write_compressed_ints(out: &mut Vec<u8>, values: &[i64], wide: bool) {
    if values.is_empty() {
        out.write_u64::<LittleEndian>(0).unwrap();
        return;
    }
    let framed = frame(&encode_ints(values, wide));
    out.write_u64::<LittleEndian>(framed.len() as u64).unwrap();
    out.extend_from_slice(&framed);
}

fn write_u32s(out: &mut Vec<u8>, values: &[u32]) {
    let widened: Vec<i64> = values.iter().map(|&v| v as i32 as i64).collect();
    write_compressed_ints(out, &widened, false);
}

fn write_i32s(out: &mut Vec<u8>, values: &[i32]) {
    let widened: Vec<i64> = values.iter().map(|&v| v as i64).collect();
    write_compressed_ints(out, &widened, false);
}

pub fn tokens_section(tokens: &[&str]) -> Vec<u8> {
    tokens_section_with_chunks(tokens, 0)
}

pub fn tokens_section_with_chunks(tokens: &[&str], chunks: u8) -> Vec<u8> {
    let mut chars = Vec::new();
    for token in tokens {
        chars.extend_from_slice(token.as_bytes());
        chars.push(0);
    }
    let framed = frame_with_chunks(&chars, chunks);

    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(tokens.len() as u64).unwrap();
    out.write_u64::<LittleEndian>(chars.len() as u64).unwrap();
    out.write_u64::<LittleEndian>(framed.len() as u64).unwrap();
    out.extend_from_slice(&framed);
    out
}

pub fn strings_section(indices: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(indices.len() as u64).unwrap();
    for &index in indices {
        out.write_u32::<LittleEndian>(index).unwrap();
    }
    out
}

/// `(token index, value rep)` pairs.
pub fn fields_section(fields: &[(u32, u64)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(fields.len() as u64).unwrap();
    let tokens: Vec<u32> = fields.iter().map(|f| f.0).collect();
    let reps: Vec<i64> = fields.iter().map(|f| f.1 as i64).collect();
    write_u32s(&mut out, &tokens);
    write_compressed_ints(&mut out, &reps, true);
    out
}

pub fn fieldsets_section(indices: &[u32]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(indices.len() as u64).unwrap();
    write_u32s(&mut out, indices);
    out
}

pub fn paths_section(path_indices: &[u32], elements: &[i32], jumps: &[i32]) -> Vec<u8> {
    paths_section_counts(path_indices.len() as u64, path_indices.len() as u64, path_indices, elements, jumps)
}

pub fn paths_section_counts(
    count: u64,
    count_again: u64,
    path_indices: &[u32],
    elements: &[i32],
    jumps: &[i32],
) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(count).unwrap();
    out.write_u64::<LittleEndian>(count_again).unwrap();
    write_u32s(&mut out, path_indices);
    write_i32s(&mut out, elements);
    write_i32s(&mut out, jumps);
    out
}

/// `(path index, field set index, spec type)` triples.
pub fn specs_section(specs: &[(u32, u32, u32)]) -> Vec<u8> {
    let mut out = Vec::new();
    out.write_u64::<LittleEndian>(specs.len() as u64).unwrap();
    let paths: Vec<u32> = specs.iter().map(|s| s.0).collect();
    let sets: Vec<u32> = specs.iter().map(|s| s.1).collect();
    let types: Vec<u32> = specs.iter().map(|s| s.2).collect();
    write_u32s(&mut out, &paths);
    write_u32s(&mut out, &sets);
    write_u32s(&mut out, &types);
    out
}

pub const END: u32 = u32::MAX;

pub const SCENE_TOKENS: &[&str] = &[
    "World",
    "Mesh",
    "points",
    "typeName",
    "specifier",
    "Other",
    "documentation",
];

/// Scene used across the integration tests:
///
/// ```text
/// /                     documentation
/// /World                typeName, specifier
/// /World/Mesh           typeName
/// /World/Mesh.points    (attribute)
/// /Other
/// ```
pub fn scene_builder() -> CrateBuilder {
    CrateBuilder::new()
        .section("TOKENS", tokens_section(SCENE_TOKENS))
        .section("STRINGS", strings_section(&[6]))
        .section(
            "FIELDS",
            fields_section(&[
                (3, 0x4000_0000_0000_0001),
                (4, 0x4000_0000_0000_0000),
                (6, 0x8000_0000_0000_0010),
            ]),
        )
        .section("FIELDSETS", fieldsets_section(&[2, END, 0, 1, END, 0, END, END]))
        .section(
            "PATHS",
            paths_section(&[0, 1, 2, 3, 4], &[0, 0, 1, -2, 5], &[-1, 3, -1, -2, -2]),
        )
        .section(
            "SPECS",
            specs_section(&[(0, 0, 7), (1, 2, 6), (2, 5, 6), (3, 7, 1), (4, 7, 6)]),
        )
}
