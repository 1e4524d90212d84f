//! Type identity tests

use super::*;
use crate::type_name;

static SHAPE: TypeInfo = TypeInfo::root(type_name!("Shape"), 16, 0);
static POLYGON: TypeInfo = TypeInfo::derived(&SHAPE, type_name!("Polygon"), 24, 8);
static SQUARE: TypeInfo = TypeInfo::derived(&POLYGON, type_name!("Square"), 32, 8);
static UNRELATED: TypeInfo = TypeInfo::root(type_name!("Unrelated"), 8, 0);

mod identity {
    use super::*;

    #[test]
    fn type_is_instance_of_itself() {
        for ty in [&SHAPE, &POLYGON, &SQUARE, &UNRELATED] {
            assert!(is_instance_of(ty, ty), "{} should match itself", ty);
        }
    }

    #[test]
    fn derived_types_match_every_base() {
        assert!(is_instance_of(&SHAPE, &SQUARE));
        assert!(is_instance_of(&POLYGON, &SQUARE));
        assert!(SQUARE.is_subtype_of(&SHAPE));
    }

    #[test]
    fn base_is_not_an_instance_of_derived() {
        assert!(!is_instance_of(&SQUARE, &POLYGON));
        assert!(!is_instance_of(&POLYGON, &SHAPE));
    }

    #[test]
    fn unrelated_chains_do_not_match() {
        assert!(!is_instance_of(&UNRELATED, &SQUARE));
        assert!(!is_instance_of(&SHAPE, &UNRELATED));
    }

    #[test]
    fn identity_is_by_descriptor_not_by_name() {
        static SHAPE_LOOKALIKE: TypeInfo = TypeInfo::root(type_name!("Shape"), 16, 0);
        assert!(!is_instance_of(&SHAPE_LOOKALIKE, &SQUARE));
    }
}

mod chains {
    use super::*;

    #[test]
    fn walking_reaches_the_root() {
        let names: Vec<&str> = SQUARE.ancestors().map(|ty| ty.name_utf8()).collect();
        assert_eq!(names, ["Square", "Polygon", "Shape"]);
        assert!(SQUARE.ancestors().last().unwrap().is_root());
    }

    #[test]
    fn depth_counts_bases() {
        assert_eq!(SHAPE.depth(), 0);
        assert_eq!(POLYGON.depth(), 1);
        assert_eq!(SQUARE.depth(), 2);
        assert_eq!(SQUARE.try_depth(2).unwrap(), 2);
        assert!(matches!(
            SQUARE.try_depth(1),
            Err(RuntimeError::TypeChainTooDeep { .. })
        ));
    }

    #[test]
    fn leaked_descriptors_extend_static_chains() {
        let circle = TypeInfo::leak("Circle", Some(&SHAPE), 24, 0).unwrap();
        assert_eq!(circle.base().map(|b| b.name_utf8()), Some("Shape"));
        assert!(is_instance_of(&SHAPE, circle));
        assert!(!is_instance_of(circle, &SHAPE));
        assert_eq!(circle.static_size(), 24);
    }

    #[test]
    fn leaked_chain_past_the_limit_is_rejected() {
        let limit = crate::config::get().limits.max_type_depth;
        let mut ty = TypeInfo::leak("Level0", None, 8, 0).unwrap();
        for level in 1..=limit {
            ty = TypeInfo::leak(&format!("Level{}", level), Some(ty), 8, 0).unwrap();
        }
        assert_eq!(ty.depth(), limit);

        let err = TypeInfo::leak("TooDeep", Some(ty), 8, 0).unwrap_err();
        assert!(matches!(err, RuntimeError::TypeChainTooDeep { .. }));
    }
}

mod names {
    use super::*;

    #[test]
    fn both_encodings_are_stored() {
        assert_eq!(SQUARE.name_utf8(), "Square");
        let expected: Vec<u16> = "Square".encode_utf16().collect();
        assert_eq!(SQUARE.name_utf16(), &expected[..]);
    }

    #[test]
    fn name_of_selects_encoding() {
        match name_of(&POLYGON, NameEncoding::Utf8) {
            EncodedName::Utf8(name) => assert_eq!(name.to_bytes(), b"Polygon"),
            other => panic!("unexpected {:?}", other),
        }
        match name_of(&POLYGON, NameEncoding::Utf16) {
            EncodedName::Utf16(name) => assert_eq!(String::from_utf16(name).unwrap(), "Polygon"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn non_ascii_names_round_trip() {
        let ty = TypeInfo::leak("Größe", None, 8, 0).unwrap();
        assert_eq!(ty.name_utf8(), "Größe");
        assert_eq!(String::from_utf16(ty.name_utf16()).unwrap(), "Größe");
    }
}

mod registry {
    use super::*;
    use crate::types::registry;

    #[test]
    fn register_and_lookup() {
        static REGISTERED: TypeInfo = TypeInfo::root(type_name!("RegistryProbe"), 8, 0);

        registry::register(&REGISTERED).unwrap();
        registry::register(&REGISTERED).unwrap();

        let found = registry::lookup("RegistryProbe").unwrap();
        assert!(std::ptr::eq(found, &REGISTERED));
        assert!(registry::registered_names().contains(&"RegistryProbe".to_string()));
    }

    #[test]
    fn different_descriptor_under_same_name_is_rejected() {
        static FIRST: TypeInfo = TypeInfo::root(type_name!("DuplicateProbe"), 8, 0);
        static SECOND: TypeInfo = TypeInfo::root(type_name!("DuplicateProbe"), 8, 0);

        registry::register(&FIRST).unwrap();
        assert!(matches!(
            registry::register(&SECOND),
            Err(RuntimeError::DuplicateType { .. })
        ));
    }

    #[test]
    fn unknown_names_are_absent() {
        assert!(registry::lookup("NoSuchType").is_none());
    }
}
