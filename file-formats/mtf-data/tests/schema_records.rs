//! Typed records on top of the schema engine

use mtf_data::prelude::*;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

static JOINT: Schema = Schema::new(
    "Joint",
    &[
        FieldDef::scalar("parent", Primitive::U8),
        FieldDef::scalar("flags", Primitive::U8),
        FieldDef::array("offset", Primitive::F32, Count::Fixed(3)),
    ],
);

fn name_len(view: &RecordView<'_>) -> Result<i64> {
    Ok(if view.int("has_name")? != 0 { 16 } else { 0 })
}

static RIG: Schema = Schema::new(
    "Rig",
    &[
        FieldDef::scalar("joint_count", Primitive::U16),
        FieldDef::scalar("has_name", Primitive::U8),
        FieldDef::bytes("name", Count::Computed(name_len)),
        FieldDef::offset_of("joints_offset", Primitive::U32, "joints"),
        FieldDef::records("joints", &JOINT, Count::Field("joint_count")),
    ],
);

#[derive(Debug, Clone, PartialEq)]
struct Joint {
    parent: u8,
    flags: u8,
    offset: [f32; 3],
}

impl SchemaRecord for Joint {
    fn schema() -> &'static Schema {
        &JOINT
    }

    fn from_structure(structure: &Structure) -> Result<Self> {
        Ok(Self {
            parent: structure.u8("parent")?,
            flags: structure.u8("flags")?,
            offset: structure.f32_array("offset")?,
        })
    }

    fn to_values(&self) -> FieldValues {
        FieldValues::new()
            .with("parent", self.parent)
            .with("flags", self.flags)
            .with("offset", self.offset)
    }
}

fn build_rig(joints: &[Joint], name: Option<&str>) -> Structure {
    let mut values = FieldValues::new();
    values
        .set("joint_count", joints.len() as u16)
        .set("joints", records_value(joints).unwrap());
    if let Some(name) = name {
        values.set("has_name", 1u8).set("name", name.as_bytes());
    }
    RIG.construct(values).unwrap()
}

#[test]
fn test_nested_records_with_optional_block() {
    let joints = vec![
        Joint {
            parent: 255,
            flags: 1,
            offset: [0.0, 0.0, 0.0],
        },
        Joint {
            parent: 0,
            flags: 0,
            offset: [1.5, -2.0, 0.25],
        },
    ];

    let named = build_rig(&joints, Some("spine"));
    assert_eq!(named.u32("joints_offset").unwrap(), 2 + 1 + 16 + 4);
    let parsed = RIG.parse(named.as_bytes()).unwrap();
    assert_eq!(parsed.fixed_str("name").unwrap(), "spine");
    assert_eq!(parsed.records_as::<Joint>("joints").unwrap(), joints);

    let anonymous = build_rig(&joints, None);
    assert_eq!(anonymous.u32("joints_offset").unwrap(), 2 + 1 + 4);
    assert_eq!(anonymous.len(), named.len() - 16);
}

#[test]
fn test_records_are_zero_copy_views() {
    let joints = vec![Joint {
        parent: 3,
        flags: 2,
        offset: [1.0, 2.0, 3.0],
    }];
    let rig = build_rig(&joints, None);
    let joint = rig.record("joints", 0).unwrap();
    assert_eq!(joint.offset(), 7);
    assert_eq!(joint.as_bytes(), rig.bytes("joints").unwrap());
}

#[test]
fn test_truncated_records_fail() {
    let rig = build_rig(
        &[Joint {
            parent: 0,
            flags: 0,
            offset: [0.0; 3],
        }],
        None,
    );
    let bytes = rig.as_bytes();
    let err = RIG.parse(bytes.slice(..bytes.len() - 1)).unwrap_err();
    assert!(err.is_malformed());
}

proptest! {
    #[test]
    fn prop_joint_count_drives_layout(count in 0usize..40, parent in any::<u8>()) {
        let joints: Vec<Joint> = (0..count)
            .map(|i| Joint { parent, flags: i as u8, offset: [i as f32, 0.0, -(i as f32)] })
            .collect();
        let rig = build_rig(&joints, None);
        prop_assert_eq!(rig.len(), 7 + count * 14);
        let parsed = RIG.parse(rig.as_bytes()).unwrap();
        prop_assert_eq!(parsed.count("joints").unwrap(), count);
        prop_assert_eq!(parsed.records_as::<Joint>("joints").unwrap(), joints);
    }
}
