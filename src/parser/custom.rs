//! Interpreters for the custom sections this crate understands: `name`,
//! `producers` and `target_features`.
//!
//! Each decoder runs inside the section's bounded frame, positioned just
//! after the section's own name.

use log::{debug, trace};
use std::io::Read;

use super::error::DecodeError;
use super::limits;
use super::module::{
    Feature, IndirectNameAssoc, IndirectNameMap, Module, NameAssoc, NameId, NameMap, Names,
    Producer, VersionedName,
};
use super::reader::Reader;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomSectionKind {
    Name,
    Producers,
    TargetFeatures,
}

impl CustomSectionKind {
    pub fn from_name(name: &str) -> Option<CustomSectionKind> {
        match name {
            "name" => Some(CustomSectionKind::Name),
            "producers" => Some(CustomSectionKind::Producers),
            "target_features" => Some(CustomSectionKind::TargetFeatures),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CustomSectionKind::Name => "name",
            CustomSectionKind::Producers => "producers",
            CustomSectionKind::TargetFeatures => "target_features",
        }
    }
}

pub fn decode_custom_section<R: Read>(
    reader: &mut Reader<R>,
    kind: CustomSectionKind,
    module: &mut Module,
) -> Result<(), DecodeError> {
    match kind {
        CustomSectionKind::Name => decode_name_section(reader, &mut module.names),
        CustomSectionKind::Producers => decode_producers_section(reader, &mut module.producers),
        CustomSectionKind::TargetFeatures => {
            decode_target_features_section(reader, &mut module.target_features)
        }
    }
}

/* COUNTS ***********************************************************************/

fn read_count<R: Read>(
    reader: &mut Reader<R>,
    what: &'static str,
    limit: u32,
) -> Result<u32, DecodeError> {
    let offset = reader.pos();
    let count = reader.read_vu32()?;
    if count > limit {
        return Err(DecodeError::LimitExceeded {
            what,
            count,
            limit,
            offset,
        });
    }
    Ok(count)
}

/// Capacity to reserve for `count` entries. Every entry takes at least one
/// byte, so a frame can never hold more entries than it has bytes left.
fn capacity<R: Read>(reader: &Reader<R>, count: u32) -> usize {
    u64::from(count).min(reader.remaining()) as usize
}

/* NAME SECTION *****************************************************************/

/// Walks `(id, size)` subsections until the section frame is exhausted.
/// Each subsection gets its own frame and must fill it exactly; unknown
/// subsection IDs are skipped by size.
pub fn decode_name_section<R: Read>(
    reader: &mut Reader<R>,
    names: &mut Names,
) -> Result<(), DecodeError> {
    while reader.remaining() > 0 {
        let id = reader.read_byte()?;
        let size = reader.read_vu32()?;
        let available = reader.remaining();
        if u64::from(size) > available {
            return Err(DecodeError::MalformedSubsection {
                id,
                offset: reader.pos(),
                size,
                available,
            });
        }

        reader.with_frame(u64::from(size), |reader| match NameId::from_byte(id) {
            Some(name_id) => {
                trace!("name subsection {} size={}", name_id, size);
                decode_name_subsection(reader, name_id, names)?;
                reader.expect_end(|| format!("name subsection {}", name_id))
            }
            None => {
                debug!("skipping name subsection #{} size={}", id, size);
                reader.skip(u64::from(size))
            }
        })?;
    }
    Ok(())
}

fn decode_name_subsection<R: Read>(
    reader: &mut Reader<R>,
    id: NameId,
    names: &mut Names,
) -> Result<(), DecodeError> {
    // a repeated subsection replaces the earlier one
    match id {
        NameId::ModuleName => names.module = Some(reader.read_name()?),
        NameId::FunctionNames => names.functions = read_name_map(reader)?,
        NameId::LocalNames => names.locals = read_indirect_name_map(reader)?,
        NameId::LabelNames => names.labels = read_indirect_name_map(reader)?,
        NameId::TypeNames => names.types = read_name_map(reader)?,
        NameId::TableNames => names.tables = read_name_map(reader)?,
        NameId::MemoryNames => names.memories = read_name_map(reader)?,
        NameId::GlobalNames => names.globals = read_name_map(reader)?,
        NameId::ElemSegmentNames => names.elem_segments = read_name_map(reader)?,
        NameId::DataSegmentNames => names.data_segments = read_name_map(reader)?,
    }
    Ok(())
}

pub fn read_name_map<R: Read>(reader: &mut Reader<R>) -> Result<NameMap, DecodeError> {
    read_name_map_with_limit(reader, limits::MAX_NAME_MAP_ENTRIES)
}

fn read_name_map_with_limit<R: Read>(
    reader: &mut Reader<R>,
    limit: u32,
) -> Result<NameMap, DecodeError> {
    let count = read_count(reader, "name map entry", limit)?;
    let mut map = Vec::with_capacity(capacity(reader, count));
    for _ in 0..count {
        let index = reader.read_vu32()?;
        let name = reader.read_name()?;
        map.push(NameAssoc { index, name });
    }
    Ok(map)
}

pub fn read_indirect_name_map<R: Read>(
    reader: &mut Reader<R>,
) -> Result<IndirectNameMap, DecodeError> {
    let count = read_count(
        reader,
        "indirect name map entry",
        limits::MAX_INDIRECT_NAME_MAP_ENTRIES,
    )?;
    let mut map = Vec::with_capacity(capacity(reader, count));
    for _ in 0..count {
        let index = reader.read_vu32()?;
        let names = read_name_map_with_limit(reader, limits::MAX_INNER_NAME_MAP_ENTRIES)?;
        map.push(IndirectNameAssoc { index, names });
    }
    Ok(map)
}

/* PRODUCERS SECTION ************************************************************/

pub fn decode_producers_section<R: Read>(
    reader: &mut Reader<R>,
    producers: &mut Vec<Producer>,
) -> Result<(), DecodeError> {
    let count = read_count(reader, "producer field", limits::MAX_PRODUCER_FIELDS)?;
    for _ in 0..count {
        let name = reader.read_name()?;
        let value_count = read_count(reader, "producer value", limits::MAX_PRODUCER_VALUES)?;
        let mut values = Vec::with_capacity(capacity(reader, value_count));
        for _ in 0..value_count {
            let name = reader.read_name()?;
            let version = reader.read_name()?;
            values.push(VersionedName { name, version });
        }
        producers.push(Producer { name, values });
    }
    debug!("producers: {} fields", producers.len());
    Ok(())
}

/* TARGET FEATURES SECTION ******************************************************/

pub fn decode_target_features_section<R: Read>(
    reader: &mut Reader<R>,
    features: &mut Vec<Feature>,
) -> Result<(), DecodeError> {
    let count = read_count(reader, "target feature", limits::MAX_TARGET_FEATURES)?;
    for _ in 0..count {
        let prefix = reader.read_byte()?;
        let name = reader.read_name()?;
        features.push(Feature { prefix, name });
    }
    debug!("target features: {}", features.len());
    Ok(())
}
