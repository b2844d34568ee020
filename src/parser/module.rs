use serde::{Serialize, Serializer};
use std::convert::TryFrom;
use std::fmt;

/// A decoded module: the metadata carried by the recognized custom sections,
/// plus every other section as an uninterpreted payload.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Module {
    /// Binary format version from the header (1 for MVP modules).
    pub version: u32,
    pub names: Names,
    pub producers: Vec<Producer>,
    pub target_features: Vec<Feature>,
    /// Non-custom sections in the order they appear in the input.
    pub sections: Vec<Section>,
}

impl Module {
    pub fn new() -> Module {
        Module::default()
    }

    pub fn function_name(&self, index: u32) -> Option<&str> {
        lookup(&self.names.functions, index)
    }

    pub fn global_name(&self, index: u32) -> Option<&str> {
        lookup(&self.names.globals, index)
    }

    pub fn data_segment_name(&self, index: u32) -> Option<&str> {
        lookup(&self.names.data_segments, index)
    }

    /// First section with the given ID, if any.
    pub fn section(&self, id: SectionId) -> Option<&Section> {
        self.sections.iter().find(|section| section.id() == id)
    }
}

fn lookup(map: &NameMap, index: u32) -> Option<&str> {
    map.iter()
        .find(|assoc| assoc.index == index)
        .map(|assoc| assoc.name.as_str())
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "version: {}", self.version)?;
        if let Some(name) = &self.names.module {
            writeln!(f, "module name: \"{}\"", name)?;
        }
        for section in &self.sections {
            writeln!(f, "section {}", section)?;
        }
        if !self.names.functions.is_empty() {
            writeln!(f, "function names: {}", self.names.functions.len())?;
        }
        if !self.names.globals.is_empty() {
            writeln!(f, "global names: {}", self.names.globals.len())?;
        }
        if !self.names.data_segments.is_empty() {
            writeln!(f, "data segment names: {}", self.names.data_segments.len())?;
        }
        for producer in &self.producers {
            writeln!(f, "producer {}", producer)?;
        }
        for feature in &self.target_features {
            writeln!(f, "target feature {}", feature)?;
        }
        Ok(())
    }
}

// Sections --------------------------------------------------------------------

/// Top-level section kinds. A byte outside this set is not a section ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionId {
    Custom = 0,
    Type = 1,
    Import = 2,
    Function = 3,
    Table = 4,
    Memory = 5,
    Global = 6,
    Export = 7,
    Start = 8,
    Element = 9,
    Code = 10,
    Data = 11,
    DataCount = 12,
}

impl SectionId {
    pub fn as_str(self) -> &'static str {
        match self {
            SectionId::Custom => "custom",
            SectionId::Type => "type",
            SectionId::Import => "import",
            SectionId::Function => "function",
            SectionId::Table => "table",
            SectionId::Memory => "memory",
            SectionId::Global => "global",
            SectionId::Export => "export",
            SectionId::Start => "start",
            SectionId::Element => "element",
            SectionId::Code => "code",
            SectionId::Data => "data",
            SectionId::DataCount => "data count",
        }
    }
}

impl TryFrom<u8> for SectionId {
    type Error = u8;

    fn try_from(byte: u8) -> Result<SectionId, u8> {
        use SectionId::*;
        Ok(match byte {
            0 => Custom,
            1 => Type,
            2 => Import,
            3 => Function,
            4 => Table,
            5 => Memory,
            6 => Global,
            7 => Export,
            8 => Start,
            9 => Element,
            10 => Code,
            11 => Data,
            12 => DataCount,
            _ => return Err(byte),
        })
    }
}

impl fmt::Display for SectionId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A section this crate does not interpret. Further variants can carry
/// decoded contents as interpreters are added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[non_exhaustive]
pub enum Section {
    Opaque {
        id: SectionId,
        #[serde(serialize_with = "serialize_hex")]
        data: Vec<u8>,
    },
}

impl Section {
    pub fn id(&self) -> SectionId {
        match self {
            Section::Opaque { id, .. } => *id,
        }
    }

    pub fn data(&self) -> &[u8] {
        match self {
            Section::Opaque { data, .. } => data,
        }
    }
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "'{}': size={}", self.id(), self.data().len())
    }
}

fn serialize_hex<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&hex::encode(data))
}

// Names -----------------------------------------------------------------------

/// Subsection IDs of the `name` custom section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameId {
    ModuleName = 0,
    FunctionNames = 1,
    LocalNames = 2,
    LabelNames = 3,
    TypeNames = 4,
    TableNames = 5,
    MemoryNames = 6,
    GlobalNames = 7,
    ElemSegmentNames = 8,
    DataSegmentNames = 9,
}

impl NameId {
    pub fn from_byte(byte: u8) -> Option<NameId> {
        use NameId::*;
        Some(match byte {
            0 => ModuleName,
            1 => FunctionNames,
            2 => LocalNames,
            3 => LabelNames,
            4 => TypeNames,
            5 => TableNames,
            6 => MemoryNames,
            7 => GlobalNames,
            8 => ElemSegmentNames,
            9 => DataSegmentNames,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            NameId::ModuleName => "ModuleName",
            NameId::FunctionNames => "FunctionNames",
            NameId::LocalNames => "LocalNames",
            NameId::LabelNames => "LabelNames",
            NameId::TypeNames => "TypeNames",
            NameId::TableNames => "TableNames",
            NameId::MemoryNames => "MemoryNames",
            NameId::GlobalNames => "GlobalNames",
            NameId::ElemSegmentNames => "ElemSegmentNames",
            NameId::DataSegmentNames => "DataSegmentNames",
        }
    }
}

impl fmt::Display for NameId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameAssoc {
    pub index: u32,
    pub name: String,
}

/// Index to name associations in input order. Indices are neither sorted
/// nor deduplicated.
pub type NameMap = Vec<NameAssoc>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndirectNameAssoc {
    pub index: u32,
    pub names: NameMap,
}

pub type IndirectNameMap = Vec<IndirectNameAssoc>;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Names {
    pub module: Option<String>,
    pub functions: NameMap,
    pub locals: IndirectNameMap,
    pub labels: IndirectNameMap,
    pub types: NameMap,
    pub tables: NameMap,
    pub memories: NameMap,
    pub globals: NameMap,
    pub elem_segments: NameMap,
    pub data_segments: NameMap,
}

// Producers -------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedName {
    pub name: String,
    pub version: String,
}

/// One field of the `producers` section, e.g. `language` or `processed-by`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Producer {
    pub name: String,
    pub values: Vec<VersionedName>,
}

impl fmt::Display for Producer {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:", self.name)?;
        for value in &self.values {
            if value.version.is_empty() {
                write!(f, " {}", value.name)?;
            } else {
                write!(f, " {} {}", value.name, value.version)?;
            }
        }
        Ok(())
    }
}

// Target features -------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureDisposition {
    /// `+`: the module uses the feature.
    Used,
    /// `-`: the module must not be linked with code using the feature.
    Disallowed,
    /// `=`: every linked module must use the feature.
    Required,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feature {
    pub prefix: u8,
    pub name: String,
}

impl Feature {
    pub fn disposition(&self) -> Option<FeatureDisposition> {
        match self.prefix {
            b'+' => Some(FeatureDisposition::Used),
            b'-' => Some(FeatureDisposition::Disallowed),
            b'=' => Some(FeatureDisposition::Required),
            _ => None,
        }
    }
}

impl fmt::Display for Feature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.prefix.is_ascii_graphic() {
            write!(f, "{}{}", self.prefix as char, self.name)
        } else {
            write!(f, "{{{:#04x}}}{}", self.prefix, self.name)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn section_id_from_byte() {
        for byte in 0..=12u8 {
            let id = SectionId::try_from(byte).unwrap();
            assert_eq!(id as u8, byte);
        }
        assert_eq!(SectionId::try_from(13), Err(13));
        assert_eq!(SectionId::try_from(0xff), Err(0xff));
        assert_eq!(SectionId::DataCount.to_string(), "data count");
    }

    #[test]
    fn name_id_from_byte() {
        assert_eq!(NameId::from_byte(1), Some(NameId::FunctionNames));
        assert_eq!(NameId::from_byte(9), Some(NameId::DataSegmentNames));
        assert_eq!(NameId::from_byte(10), None);
        assert_eq!(NameId::GlobalNames.to_string(), "GlobalNames");
    }

    #[test]
    fn name_lookup_returns_first_match() {
        let mut module = Module::new();
        module.names.functions = vec![
            NameAssoc {
                index: 3,
                name: "three".to_string(),
            },
            NameAssoc {
                index: 0,
                name: "zero".to_string(),
            },
            NameAssoc {
                index: 3,
                name: "shadowed".to_string(),
            },
        ];
        assert_eq!(module.function_name(3), Some("three"));
        assert_eq!(module.function_name(0), Some("zero"));
        assert_eq!(module.function_name(1), None);
        assert_eq!(module.global_name(0), None);
    }

    #[test]
    fn feature_disposition() {
        let feature = |prefix: u8| Feature {
            prefix,
            name: "simd128".to_string(),
        };
        assert_eq!(feature(b'+').disposition(), Some(FeatureDisposition::Used));
        assert_eq!(
            feature(b'-').disposition(),
            Some(FeatureDisposition::Disallowed)
        );
        assert_eq!(
            feature(b'=').disposition(),
            Some(FeatureDisposition::Required)
        );
        assert_eq!(feature(b'?').disposition(), None);
        assert_eq!(feature(b'+').to_string(), "+simd128");
        assert_eq!(feature(0).to_string(), "{0x00}simd128");
    }

    #[test]
    fn display_summary() {
        let mut module = Module::new();
        module.version = 1;
        module.sections.push(Section::Opaque {
            id: SectionId::Type,
            data: vec![1, 0x60, 0, 0],
        });
        module.producers.push(Producer {
            name: "processed-by".to_string(),
            values: vec![VersionedName {
                name: "clang".to_string(),
                version: "14.0".to_string(),
            }],
        });
        assert_eq!(
            module.to_string(),
            "version: 1\nsection 'type': size=4\nproducer processed-by: clang 14.0\n"
        );
    }
}
