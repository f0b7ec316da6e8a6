//! Crate container reader: header, table of contents and sections.

use std::collections::HashMap;
use std::path::Path as FsPath;
use std::sync::Arc;

use super::format::*;
use super::integer_coding::read_compressed_integers;
use super::paths::read_paths;
use super::streams::{ByteCursor, CrateSource};
use super::tokens::read_tokens;
use super::value_rep::{Field, FieldSets, ValueRep};
use crate::sdf::{CompositionPolicy, FieldEntry, Path, SpecType, Token, TokenRegistry};
use crate::util::{Error, Result};

/// Options controlling how a file is opened and composed.
#[derive(Clone, Debug)]
pub struct ReadOptions {
    /// Memory map files instead of reading them into memory.
    pub use_mmap: bool,
    /// What to do with specs that are not prims.
    pub composition: CompositionPolicy,
    /// Reject TOC entries and offsets that point outside the file.
    pub validate_section_bounds: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self {
            use_mmap: cfg!(feature = "mmap"),
            composition: CompositionPolicy::default(),
            validate_section_bounds: true,
        }
    }
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_mmap(mut self, use_mmap: bool) -> Self {
        self.use_mmap = use_mmap;
        self
    }

    pub fn with_composition(mut self, composition: CompositionPolicy) -> Self {
        self.composition = composition;
        self
    }

    pub fn with_section_bounds_check(mut self, validate: bool) -> Self {
        self.validate_section_bounds = validate;
        self
    }
}

/// One entry of the SPECS section.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SpecRecord {
    pub path_index: u32,
    pub field_set_index: u32,
    pub spec_type: SpecType,
}

/// Decoded structural tables of one Crate file.
pub struct CrateFile {
    version: Version,
    toc_offset: u64,
    sections: Vec<TocSection>,
    registry: Arc<TokenRegistry>,
    tokens: Vec<Token>,
    string_indices: Vec<u32>,
    fields: Vec<Field>,
    field_sets: Option<FieldSets>,
    paths: Vec<Path>,
    specs: Vec<SpecRecord>,
}

impl CrateFile {
    /// Open and decode a file with default options and a fresh registry.
    pub fn open(path: impl AsRef<FsPath>) -> Result<Self> {
        Self::open_opts(path, &ReadOptions::default(), TokenRegistry::shared())
    }

    pub fn open_opts(
        path: impl AsRef<FsPath>,
        options: &ReadOptions,
        registry: Arc<TokenRegistry>,
    ) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!("Reading crate file: {}", path.display());
        let source = CrateSource::open_opts(path, options.use_mmap)?;
        Self::read(source.as_bytes(), options, registry)
    }

    /// Decode in-memory bytes with default options and a fresh registry.
    ///
    /// See [`CrateFile::read`] for the version requirement.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Self::read(bytes, &ReadOptions::default(), TokenRegistry::shared())
    }

    /// Decode a whole file image.
    ///
    /// Nothing is returned unless every known section decodes. Files older
    /// than [`MIN_SUPPORTED_VERSION`] (0.4.0) store their structural sections
    /// uncompressed and fail with [`Error::UnsupportedVersion`].
    pub fn read(data: &[u8], options: &ReadOptions, registry: Arc<TokenRegistry>) -> Result<Self> {
        if data.get(..CRATE_MAGIC.len()) != Some(&CRATE_MAGIC[..]) {
            return Err(Error::InvalidMagic);
        }

        let mut cursor = ByteCursor::at(data, VERSION_OFFSET as u64)?;
        let [major, minor, patch] = cursor.read_array::<3>()?;
        let version = Version::new(major, minor, patch);
        cursor.seek(TOC_OFFSET_POS as u64)?;
        let toc_offset = cursor.read_u64()?;
        tracing::info!("Crate version: {}", version);

        if !version.is_supported() {
            return Err(Error::UnsupportedVersion(version));
        }

        let sections = read_toc(data, toc_offset)?;
        if options.validate_section_bounds {
            for section in &sections {
                if section.start >= data.len() as u64 {
                    return Err(Error::invalid(format!(
                        "section {} starts at {:#x}, past end of file ({:#x})",
                        section.name,
                        section.start,
                        data.len()
                    )));
                }
            }
        }

        let mut by_name: HashMap<&str, &TocSection> = HashMap::new();
        for section in &sections {
            if !section.is_known() {
                tracing::warn!("Unrecognized section: {}", section.name);
                continue;
            }
            if by_name.insert(section.name.as_str(), section).is_some() {
                return Err(Error::invalid(format!("duplicate section {}", section.name)));
            }
        }

        let mut file = Self {
            version,
            toc_offset,
            sections: Vec::new(),
            registry,
            tokens: Vec::new(),
            string_indices: Vec::new(),
            fields: Vec::new(),
            field_sets: None,
            paths: Vec::new(),
            specs: Vec::new(),
        };

        for name in SECTION_DECODE_ORDER {
            let Some(section) = by_name.get(name) else {
                continue;
            };
            tracing::debug!(
                "Section \"{}\" from {:#010x} to {:#010x}",
                section.name,
                section.start,
                section.end
            );
            let mut cursor = ByteCursor::at(data, section.start)?;
            match name {
                TOKENS_SECTION => file.tokens = read_tokens(&mut cursor, &file.registry)?,
                STRINGS_SECTION => file.string_indices = read_string_indices(&mut cursor, file.tokens.len())?,
                FIELDS_SECTION => file.fields = read_fields(&mut cursor, file.tokens.len())?,
                FIELDSETS_SECTION => file.field_sets = Some(read_field_sets(&mut cursor)?),
                PATHS_SECTION => file.paths = read_paths(&mut cursor, &file.tokens)?,
                SPECS_SECTION => file.specs = read_specs(&mut cursor)?,
                _ => unreachable!("decode order only lists known sections"),
            }
        }

        file.sections = sections;
        tracing::info!(
            "Read {} tokens, {} strings, {} fields, {} fieldSets, {} paths, {} specs",
            file.tokens.len(),
            file.string_indices.len(),
            file.fields.len(),
            file.field_sets.as_ref().map_or(0, FieldSets::len),
            file.paths.len(),
            file.specs.len()
        );
        Ok(file)
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn toc_offset(&self) -> u64 {
        self.toc_offset
    }

    /// TOC entries in file order, unknown sections included.
    pub fn sections(&self) -> &[TocSection] {
        &self.sections
    }

    pub fn section(&self, name: &str) -> Option<&TocSection> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn registry(&self) -> &Arc<TokenRegistry> {
        &self.registry
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn token(&self, index: u32) -> Result<&Token> {
        self.tokens
            .get(index as usize)
            .ok_or_else(|| Error::out_of_bounds("token", index, self.tokens.len()))
    }

    /// STRINGS table: token indices of string-valued data.
    pub fn string_indices(&self) -> &[u32] {
        &self.string_indices
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// `None` when the file has no FIELDSETS section.
    pub fn field_sets(&self) -> Option<&FieldSets> {
        self.field_sets.as_ref()
    }

    /// Resolved fields of the set starting at `start`.
    ///
    /// Empty when the file carries no FIELDSETS section.
    pub fn field_set(&self, start: u32) -> Result<Vec<FieldEntry>> {
        let Some(sets) = &self.field_sets else {
            return Ok(Vec::new());
        };
        sets.fields_at(start)?
            .iter()
            .map(|&index| {
                let field = self
                    .fields
                    .get(index as usize)
                    .ok_or_else(|| Error::out_of_bounds("field", index, self.fields.len()))?;
                Ok(FieldEntry {
                    name: self.token(field.token_index)?.clone(),
                    value: field.value_rep,
                })
            })
            .collect()
    }

    /// Paths indexed by on-disk path index.
    pub fn paths(&self) -> &[Path] {
        &self.paths
    }

    pub fn path(&self, index: u32) -> Result<&Path> {
        self.paths
            .get(index as usize)
            .ok_or_else(|| Error::out_of_bounds("path", index, self.paths.len()))
    }

    pub fn specs(&self) -> &[SpecRecord] {
        &self.specs
    }
}

/// Read the table of contents at `toc_offset`.
pub fn read_toc(data: &[u8], toc_offset: u64) -> Result<Vec<TocSection>> {
    let mut cursor = ByteCursor::at(data, toc_offset)?;
    let count = cursor.read_count(SECTION_RECORD_SIZE)?;

    let mut sections = Vec::with_capacity(count);
    for _ in 0..count {
        let raw = cursor.read_array::<SECTION_NAME_SIZE>()?;
        let name = section_name(&raw)?.to_string();
        let start = cursor.read_u64()?;
        let end = cursor.read_u64()?;
        sections.push(TocSection { name, start, end });
    }
    Ok(sections)
}

fn read_string_indices(cursor: &mut ByteCursor<'_>, num_tokens: usize) -> Result<Vec<u32>> {
    let count = cursor.read_count(4)?;
    let mut indices = Vec::with_capacity(count);
    for _ in 0..count {
        let index = cursor.read_u32()?;
        if index as usize >= num_tokens {
            return Err(Error::out_of_bounds("string token", index, num_tokens));
        }
        indices.push(index);
    }
    tracing::debug!(count, "read string indices");
    Ok(indices)
}

fn read_element_count(cursor: &mut ByteCursor<'_>, what: &str) -> Result<usize> {
    let count = cursor.read_u64()?;
    usize::try_from(count).map_err(|_| Error::invalid(format!("{} count {} too large", what, count)))
}

fn read_fields(cursor: &mut ByteCursor<'_>, num_tokens: usize) -> Result<Vec<Field>> {
    let num_fields = read_element_count(cursor, "field")?;
    let token_indices = read_compressed_integers::<u32, i32>(cursor, num_fields)?;
    let value_reps = read_compressed_integers::<u64, i64>(cursor, num_fields)?;

    let fields = token_indices
        .into_iter()
        .zip(value_reps)
        .map(|(token_index, rep)| {
            if token_index as usize >= num_tokens {
                return Err(Error::out_of_bounds("field token", token_index, num_tokens));
            }
            Ok(Field {
                token_index,
                value_rep: ValueRep(rep),
            })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(count = fields.len(), "read fields");
    Ok(fields)
}

fn read_field_sets(cursor: &mut ByteCursor<'_>) -> Result<FieldSets> {
    let num_field_sets = read_element_count(cursor, "field set")?;
    let indices = read_compressed_integers::<u32, i32>(cursor, num_field_sets)?;
    tracing::debug!(count = indices.len(), "read field sets");
    Ok(FieldSets::new(indices))
}

fn read_specs(cursor: &mut ByteCursor<'_>) -> Result<Vec<SpecRecord>> {
    let num_specs = read_element_count(cursor, "spec")?;
    let path_indices = read_compressed_integers::<u32, i32>(cursor, num_specs)?;
    let field_set_indices = read_compressed_integers::<u32, i32>(cursor, num_specs)?;
    let spec_types = read_compressed_integers::<u32, i32>(cursor, num_specs)?;

    let specs = path_indices
        .into_iter()
        .zip(field_set_indices)
        .zip(spec_types)
        .map(|((path_index, field_set_index), spec_type)| {
            Ok(SpecRecord {
                path_index,
                field_set_index,
                spec_type: SpecType::try_from(spec_type)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::debug!(count = specs.len(), "read specs");
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(version: [u8; 3], toc_offset: u64) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(CRATE_MAGIC);
        data.extend_from_slice(&version);
        data.extend_from_slice(&[0u8; 5]);
        data.extend_from_slice(&toc_offset.to_le_bytes());
        data
    }

    fn toc(data: &mut Vec<u8>, sections: &[(&str, u64, u64)]) {
        data.extend_from_slice(&(sections.len() as u64).to_le_bytes());
        for (name, start, end) in sections {
            let mut raw = [0u8; SECTION_NAME_SIZE];
            raw[..name.len()].copy_from_slice(name.as_bytes());
            data.extend_from_slice(&raw);
            data.extend_from_slice(&start.to_le_bytes());
            data.extend_from_slice(&end.to_le_bytes());
        }
    }

    #[test]
    fn test_bad_magic() {
        let mut data = header([0, 8, 0], 24);
        data[..8].copy_from_slice(b"XXXXXXXX");
        toc(&mut data, &[]);
        assert!(matches!(CrateFile::from_bytes(&data), Err(Error::InvalidMagic)));
        assert!(matches!(CrateFile::from_bytes(b"PXR"), Err(Error::InvalidMagic)));
    }

    #[test]
    fn test_old_version_rejected() {
        let mut data = header([0, 3, 2], 24);
        toc(&mut data, &[]);
        let err = CrateFile::from_bytes(&data).err().unwrap();
        assert!(matches!(err, Error::UnsupportedVersion(v) if v == Version::new(0, 3, 2)));
    }

    #[test]
    fn test_version_boundary() {
        let mut data = header([0, 4, 0], 24);
        toc(&mut data, &[]);
        assert_eq!(CrateFile::from_bytes(&data).unwrap().version(), Version::new(0, 4, 0));

        let mut data = header([0, 0, 1], 24);
        toc(&mut data, &[]);
        let err = CrateFile::from_bytes(&data).err().unwrap();
        assert!(err.is_unsupported());
    }

    #[test]
    fn test_header_padding_ignored() {
        let mut data = header([0, 8, 0], 24);
        data[11..TOC_OFFSET_POS].copy_from_slice(&[0xFF; 5]);
        toc(&mut data, &[]);
        let file = CrateFile::from_bytes(&data).unwrap();
        assert_eq!(file.toc_offset(), 24);
    }

    #[test]
    fn test_empty_toc() {
        let mut data = header([0, 8, 0], 24);
        toc(&mut data, &[]);
        let file = CrateFile::from_bytes(&data).unwrap();
        assert_eq!(file.version(), Version::new(0, 8, 0));
        assert_eq!(file.toc_offset(), 24);
        assert!(file.sections().is_empty());
        assert!(file.tokens().is_empty());
        assert!(file.field_sets().is_none());
    }

    #[test]
    fn test_toc_past_end() {
        let data = header([0, 8, 0], 4096);
        assert!(matches!(
            CrateFile::from_bytes(&data),
            Err(Error::UnexpectedEof(_))
        ));
    }

    #[test]
    fn test_unknown_section_is_skipped() {
        let mut data = header([0, 8, 0], 24);
        toc(&mut data, &[("CUSTOM", 24, 32)]);
        let file = CrateFile::from_bytes(&data).unwrap();
        assert_eq!(file.sections().len(), 1);
        assert_eq!(file.section("CUSTOM").unwrap().start, 24);
    }

    #[test]
    fn test_section_bounds() {
        let mut data = header([0, 8, 0], 24);
        toc(&mut data, &[("STRINGS", 10_000, 10_008)]);
        assert!(matches!(
            CrateFile::from_bytes(&data),
            Err(Error::InvalidStructure(_))
        ));

        let lenient = ReadOptions::new().with_section_bounds_check(false);
        let result = CrateFile::read(&data, &lenient, TokenRegistry::shared());
        assert!(matches!(result, Err(Error::UnexpectedEof(_))));
    }

    #[test]
    fn test_duplicate_section() {
        let mut data = header([0, 8, 0], 24);
        toc(&mut data, &[("STRINGS", 24, 32), ("STRINGS", 24, 32)]);
        assert!(matches!(
            CrateFile::from_bytes(&data),
            Err(Error::InvalidStructure(_))
        ));
    }

    #[test]
    fn test_strings_need_tokens() {
        // STRINGS entry referring to a token that does not exist
        let mut data = header([0, 8, 0], 0);
        let strings_at = data.len() as u64;
        data.extend_from_slice(&1u64.to_le_bytes());
        data.extend_from_slice(&0u32.to_le_bytes());
        let toc_at = data.len() as u64;
        toc(&mut data, &[("STRINGS", strings_at, toc_at)]);
        data[16..24].copy_from_slice(&toc_at.to_le_bytes());

        assert!(matches!(
            CrateFile::from_bytes(&data),
            Err(Error::IndexOutOfBounds { .. })
        ));
    }
}
