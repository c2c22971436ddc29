use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;

use copier::converters::{self, format_rfc3339};
use copier::{Copier, CopyError, Mappable, RenamePair, TypeErrorPolicy};

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S1 {
    id: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S1WithPointer {
    id: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S2 {
    id: i64,
    created_at: String,
    id2: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S3 {
    embedded: S1,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S3WithPointer {
    embedded: Option<Box<S1>>,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S4 {
    embedded: S2,
    s2: S2,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S5 {
    s1: S1,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct S6 {
    s5: S5,
}

fn t1() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 2, 1, 8, 30, 15).unwrap()
}

fn t2() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 4, 4, 23, 59, 59).unwrap()
}

fn parse_id(id: String) -> i64 {
    id.parse().unwrap_or_default()
}

#[test]
fn struct_to_struct() {
    let s1 = S1 {
        id: "id1".to_string(),
        created_at: t1(),
    };
    let mut s2 = S2::default();
    let copier = Copier::builder()
        .ignore_type_errors(true)
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();
    copier.from(&s1).to(&mut s2).unwrap();

    assert_eq!(s2.id, 0);
    assert_eq!(s2.created_at, format_rfc3339(&s1.created_at));
}

#[test]
fn nested_struct_of_different_type() {
    let s3 = S3 {
        embedded: S1 {
            id: "test".to_string(),
            created_at: t1(),
        },
    };
    let mut s4 = S4::default();
    let copier = Copier::builder()
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();
    copier.copy(&s3, &mut s4).unwrap();

    assert_eq!(s4.embedded.created_at, "2023-02-01T08:30:15Z");
    assert_eq!(s4.s2, S2::default());
}

#[test]
fn rename_fans_out_to_every_target() {
    let s3 = S3 {
        embedded: S1 {
            id: "test".to_string(),
            created_at: t1(),
        },
    };
    let mut s4 = S4::default();
    let copier = Copier::builder()
        .register_rename_pairs([RenamePair::new("embedded", ["embedded", "s2"])])
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();
    copier.copy(&s3, &mut s4).unwrap();

    assert_eq!(s4.embedded.created_at, format_rfc3339(&s3.embedded.created_at));
    assert_eq!(s4.s2.created_at, format_rfc3339(&s3.embedded.created_at));
}

#[test]
fn transformers_replace_source_values() {
    let s1 = S1 {
        id: "123".to_string(),
        created_at: t1(),
    };
    let mut s2 = S2::default();
    let copier = Copier::builder()
        .register_transformer("id", parse_id)
        .register_transformer("created_at", |created_at: DateTime<Utc>| created_at.year().to_string())
        .build()
        .unwrap();
    copier.copy(&s1, &mut s2).unwrap();

    assert_eq!(s2.id, 123);
    assert_eq!(s2.created_at, "2023");
}

#[test]
fn transformer_on_renamed_field() {
    let s1 = S1 {
        id: "1".to_string(),
        created_at: t1(),
    };
    let mut s2 = S2::default();
    let copier = Copier::builder()
        .register_converter(converters::time_to_string())
        .register_rename_pairs([RenamePair::new("id", ["id2"])])
        .register_transformer("id2", parse_id)
        .build()
        .unwrap();
    copier.copy(&s1, &mut s2).unwrap();

    assert_eq!(s2.id2, 1);
    assert_eq!(s2.id, 0);
}

#[test]
fn transform_runs_before_conversion() {
    let s1 = S1 {
        id: String::new(),
        created_at: t1(),
    };
    let mut s2 = S2::default();
    let copier = Copier::builder()
        .policy(TypeErrorPolicy::Strict)
        .register_converter(converters::time_to_string())
        .register_transformer("created_at", |t: DateTime<Utc>| t + Duration::days(1))
        .register_transformer("id", parse_id)
        .build()
        .unwrap();
    copier.copy(&s1, &mut s2).unwrap();

    assert_eq!(s2.id, 0);
    assert_eq!(s2.created_at, "2023-02-02T08:30:15Z");
}

#[test]
fn time_slice_to_string_slice() {
    let copier = Copier::builder()
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();
    let times = vec![t1(), t2()];
    let mut strings: Vec<String> = Vec::new();
    copier.copy(&times, &mut strings).unwrap();

    assert_eq!(strings, [format_rfc3339(&t1()), format_rfc3339(&t2())]);
}

#[test]
fn string_slice_to_boxed_time_slice() {
    let copier = Copier::builder()
        .register_converter(converters::string_to_time())
        .build()
        .unwrap();
    let strings = vec![format_rfc3339(&t1()), format_rfc3339(&t2())];
    let mut times: Vec<Option<DateTime<Utc>>> = Vec::new();
    copier.copy(&strings, &mut times).unwrap();

    assert_eq!(times.len(), 2);
    assert_eq!(times[0].map(|t| t.timestamp()), Some(t1().timestamp()));
    assert_eq!(times[1].map(|t| t.timestamp()), Some(t2().timestamp()));
}

fn slice_copier() -> Copier {
    Copier::builder()
        .register_converter(converters::time_to_string())
        .register_rename_pairs([RenamePair::new("id", ["id2"])])
        .register_transformer("id2", parse_id)
        .build()
        .unwrap()
}

fn s1_slice() -> Vec<S1> {
    vec![
        S1 {
            id: "1".to_string(),
            created_at: t1(),
        },
        S1 {
            id: "2".to_string(),
            created_at: t2(),
        },
    ]
}

#[test]
fn struct_slice() {
    let slice1 = s1_slice();
    let mut slice2: Vec<S2> = Vec::new();
    slice_copier().copy(&slice1, &mut slice2).unwrap();

    assert_eq!(slice2.len(), slice1.len());
    assert_eq!(slice2[0].id2, 1);
    assert_eq!(slice2[1].id2, 2);
    assert_eq!(slice2[1].created_at, format_rfc3339(&t2()));
}

#[test]
fn struct_pointer_slice() {
    let slice1 = s1_slice();
    let mut slice2: Vec<Option<Box<S2>>> = vec![None; 5];
    slice_copier().copy(&slice1, &mut slice2).unwrap();

    assert_eq!(slice2.len(), slice1.len());
    let ids: Vec<_> = slice2.iter().map(|s| s.as_ref().map(|s| s.id2)).collect();
    assert_eq!(ids, [Some(1), Some(2)]);
}

#[test]
fn multi_level_rename() {
    let s5 = S5 {
        s1: S1 {
            id: "123".to_string(),
            created_at: t1(),
        },
    };
    let mut s6 = S6::default();
    let copier = Copier::builder()
        .register_rename_pairs([RenamePair::new("s1.id", ["s5.s1.id"])])
        .build()
        .unwrap();
    copier.copy(&s5, &mut s6).unwrap();

    assert_eq!(s6.s5.s1.id, s5.s1.id);
    assert_eq!(s6.s5.s1.created_at, DateTime::<Utc>::default());
}

#[test]
fn multi_level_rename_with_transformer() {
    let s5 = S5 {
        s1: S1 {
            id: "123".to_string(),
            created_at: t1(),
        },
    };
    let mut s6 = S6::default();
    let copier = Copier::builder()
        .register_rename_pairs([RenamePair::new("s1.id", ["s5.s1.id"])])
        .register_transformer("s5.s1.id", |id: String| format!("test_{id}"))
        .build()
        .unwrap();
    copier.copy(&s5, &mut s6).unwrap();

    assert_eq!(s6.s5.s1.id, "test_123");
}

#[test]
fn partial_copy_into_nested_destination() {
    let s5 = S5 {
        s1: S1 {
            id: "123".to_string(),
            created_at: t1(),
        },
    };
    let mut s6 = S6::default();
    Copier::default().copy(&s5.s1, &mut s6.s5.s1).unwrap();

    assert_eq!(s6.s5.s1, s5.s1);
}

#[test]
fn value_into_pointer_fields() {
    let from = S1 {
        id: "123".to_string(),
        created_at: t1(),
    };
    let mut to = S1WithPointer::default();
    Copier::default().copy(&from, &mut to).unwrap();

    assert_eq!(to.id.as_deref(), Some("123"));
    assert_eq!(to.created_at, Some(from.created_at));
}

#[test]
fn pointer_fields_into_values() {
    let from = S1WithPointer {
        id: Some("abc".to_string()),
        created_at: None,
    };
    let mut to = S1 {
        id: String::new(),
        created_at: t2(),
    };
    Copier::default().copy(&from, &mut to).unwrap();

    assert_eq!(to.id, "abc");
    assert_eq!(to.created_at, DateTime::<Utc>::default());
}

#[test]
fn struct_into_struct_pointer() {
    let from = S3 {
        embedded: S1 {
            id: "123".to_string(),
            created_at: t1(),
        },
    };
    let mut to = S3WithPointer::default();
    Copier::default().copy(&from, &mut to).unwrap();

    let embedded = to.embedded.expect("pointer allocated");
    assert_eq!(*embedded, from.embedded);
}

#[test]
fn empty_string_to_time_is_zero_when_ignoring() {
    let from = S2::default();
    let mut to = S1 {
        id: "keep".to_string(),
        created_at: t1(),
    };
    let copier = Copier::builder()
        .register_converter(converters::string_to_time())
        .build()
        .unwrap();
    copier.copy(&from, &mut to).unwrap();

    assert_eq!(to.id, "");
    assert_eq!(to.created_at, DateTime::<Utc>::default());
}

#[test]
fn skip_zero_values_leaves_destination_alone() {
    let from = S2::default();
    let mut to = S1 {
        id: "keep".to_string(),
        created_at: t1(),
    };
    let copier = Copier::builder()
        .ignore_type_errors(true)
        .skip_zero_values(true)
        .register_converter(converters::string_to_time())
        .build()
        .unwrap();
    copier.copy(&from, &mut to).unwrap();

    assert_eq!(to.id, "keep");
    assert_eq!(to.created_at, t1());
}

#[test]
fn skip_zero_values_skips_zero_nested_structs_and_nil_pointers() {
    let copier = Copier::builder().skip_zero_values(true).build().unwrap();

    let from = S3 {
        embedded: S1::default(),
    };
    let kept = S1 {
        id: "keep".to_string(),
        created_at: t1(),
    };
    let mut to = S3 {
        embedded: kept.clone(),
    };
    copier.copy(&from, &mut to).unwrap();
    assert_eq!(to.embedded, kept);

    let from = S3WithPointer { embedded: None };
    let mut to = S3 {
        embedded: kept.clone(),
    };
    copier.copy(&from, &mut to).unwrap();
    assert_eq!(to.embedded, kept);

    let from = S1WithPointer {
        id: Some("new".to_string()),
        created_at: None,
    };
    let mut to = kept.clone();
    copier.copy(&from, &mut to).unwrap();
    assert_eq!(to.id, "new");
    assert_eq!(to.created_at, t1());
}

#[test]
fn converter_error_surfaces_in_strict_mode() {
    let from = S2 {
        created_at: "not a time".to_string(),
        ..S2::default()
    };
    let mut to = S1::default();
    let copier = Copier::builder()
        .policy(TypeErrorPolicy::Strict)
        .register_converter(converters::string_to_time())
        .register_rename_pairs([RenamePair::new("id", ["unused"])])
        .build()
        .unwrap();
    let err = copier.copy(&from, &mut to).unwrap_err();

    assert!(matches!(err, CopyError::Converter { .. }), "{err}");
    assert!(!err.is_config());
}

#[test]
fn unconvertible_field_in_strict_mode() {
    let from = S1 {
        id: "abc".to_string(),
        created_at: t1(),
    };
    let mut to = S2 {
        id2: 7,
        ..S2::default()
    };
    let copier = Copier::new(TypeErrorPolicy::Strict);
    let err = copier.copy(&from, &mut to).unwrap_err();

    assert_eq!(err.to_string(), "cannot convert value from String to i64");
    assert_eq!(to.id2, 7);
}

#[test]
fn per_call_policy_overrides_copier_default() {
    let from = S1 {
        id: "abc".to_string(),
        created_at: t1(),
    };
    let mut to = S2::default();
    let copier = Copier::default();

    assert!(copier.from(&from).to(&mut to).is_ok());
    let err = copier
        .from(&from)
        .policy(TypeErrorPolicy::Strict)
        .to(&mut to)
        .unwrap_err();
    assert!(matches!(err, CopyError::Unconvertible { .. }));
}

#[test]
fn nil_source_resets_destination() {
    let from: Option<S1> = None;
    let mut to = S2 {
        id: 5,
        created_at: "x".to_string(),
        id2: 6,
    };
    Copier::new(TypeErrorPolicy::Strict).copy(&from, &mut to).unwrap();

    assert_eq!(to, S2::default());
}

#[test]
fn sequence_element_error_reports_index() {
    let copier = Copier::builder()
        .policy(TypeErrorPolicy::Strict)
        .register_converter(converters::string_to_time())
        .build()
        .unwrap();
    let texts = vec![format_rfc3339(&t1()), "not a time".to_string(), format_rfc3339(&t2())];
    let mut times = vec![t2()];
    let err = copier.copy(&texts, &mut times).unwrap_err();

    let CopyError::Element { index, source } = err else {
        panic!("expected an element error");
    };
    assert_eq!(index, 1);
    assert!(matches!(*source, CopyError::Converter { .. }));
    assert_eq!(times, [t2()]);
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Wide {
    count: i32,
    name: String,
    ratio: f32,
    tags: Vec<String>,
    extra: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Narrow {
    count: i64,
    name: String,
    ratio: f64,
    tags: Vec<String>,
}

#[test]
fn superset_source_copies_matching_fields_with_widening() {
    let wide = Wide {
        count: 42,
        name: "n".to_string(),
        ratio: 0.5,
        tags: vec!["a".to_string(), "b".to_string()],
        extra: true,
    };
    let mut narrow = Narrow::default();
    Copier::new(TypeErrorPolicy::Strict).copy(&wide, &mut narrow).unwrap();

    assert_eq!(
        narrow,
        Narrow {
            count: 42,
            name: "n".to_string(),
            ratio: 0.5,
            tags: vec!["a".to_string(), "b".to_string()],
        }
    );
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Audit {
    created_by: String,
    revision: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Document {
    #[copier(embed)]
    audit: Audit,
    title: String,
    #[copier(skip)]
    cached_len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct FlatDocument {
    created_by: String,
    revision: u64,
    title: String,
    cached_len: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct DocumentWithAuditPointer {
    #[copier(embed)]
    audit: Option<Box<Audit>>,
    title: String,
}

#[test]
fn embedded_fields_are_promoted() {
    let doc = Document {
        audit: Audit {
            created_by: "ann".to_string(),
            revision: 3,
        },
        title: "spec".to_string(),
        cached_len: 99,
    };
    let mut flat = FlatDocument::default();
    Copier::new(TypeErrorPolicy::Strict).copy(&doc, &mut flat).unwrap();

    assert_eq!(
        flat,
        FlatDocument {
            created_by: "ann".to_string(),
            revision: 3,
            title: "spec".to_string(),
            cached_len: 0,
        }
    );

    let mut back = Document::default();
    Copier::new(TypeErrorPolicy::Strict).copy(&flat, &mut back).unwrap();
    assert_eq!(back.audit, doc.audit);
    assert_eq!(back.title, doc.title);
    assert_eq!(back.cached_len, 0);
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct Shelf {
    doc: Document,
    spare: Option<Box<Document>>,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct FlatShelf {
    doc: FlatDocument,
    spare: FlatDocument,
}

#[test]
fn skipped_destination_fields_keep_their_value() {
    let flat = FlatDocument {
        created_by: "ann".to_string(),
        revision: 2,
        title: "t".to_string(),
        cached_len: 5,
    };
    let mut doc = Document {
        cached_len: 42,
        ..Document::default()
    };
    Copier::new(TypeErrorPolicy::Strict).copy(&flat, &mut doc).unwrap();

    assert_eq!(doc.title, "t");
    assert_eq!(doc.audit.revision, 2);
    assert_eq!(doc.cached_len, 42);
}

#[test]
fn nested_skipped_fields_keep_their_value() {
    let from = FlatShelf {
        doc: FlatDocument {
            title: "first".to_string(),
            ..FlatDocument::default()
        },
        spare: FlatDocument {
            title: "second".to_string(),
            ..FlatDocument::default()
        },
    };
    let mut shelf = Shelf {
        doc: Document {
            cached_len: 7,
            ..Document::default()
        },
        spare: Some(Box::new(Document {
            cached_len: 8,
            ..Document::default()
        })),
    };
    Copier::new(TypeErrorPolicy::Strict).copy(&from, &mut shelf).unwrap();

    assert_eq!(shelf.doc.title, "first");
    assert_eq!(shelf.doc.cached_len, 7);
    let spare = shelf.spare.expect("spare kept");
    assert_eq!(spare.title, "second");
    assert_eq!(spare.cached_len, 8);
}

#[test]
fn partial_copy_keeps_skipped_fields_of_the_target() {
    let mut shelf = Shelf {
        doc: Document {
            cached_len: 11,
            ..Document::default()
        },
        spare: None,
    };
    let flat = FlatDocument {
        title: "partial".to_string(),
        ..FlatDocument::default()
    };
    Copier::default().copy(&flat, &mut shelf.doc).unwrap();

    assert_eq!(shelf.doc.title, "partial");
    assert_eq!(shelf.doc.cached_len, 11);
}

#[test]
fn embedded_pointer_is_allocated_on_write() {
    let flat = FlatDocument {
        created_by: "bob".to_string(),
        revision: 1,
        title: "t".to_string(),
        cached_len: 0,
    };
    let mut doc = DocumentWithAuditPointer::default();
    Copier::default().copy(&flat, &mut doc).unwrap();

    assert_eq!(
        doc.audit.as_deref(),
        Some(&Audit {
            created_by: "bob".to_string(),
            revision: 1,
        })
    );

    let mut out = FlatDocument {
        created_by: "keep".to_string(),
        ..FlatDocument::default()
    };
    let no_audit = DocumentWithAuditPointer {
        audit: None,
        title: "only title".to_string(),
    };
    Copier::default().copy(&no_audit, &mut out).unwrap();
    assert_eq!(out.created_by, "keep");
    assert_eq!(out.title, "only title");
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct TextBlob {
    data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Mappable)]
struct ByteBlob {
    data: Vec<u8>,
}

#[test]
fn strings_and_bytes_convert_natively() {
    let text = TextBlob {
        data: "héllo".to_string(),
    };
    let mut bytes = ByteBlob::default();
    let copier = Copier::new(TypeErrorPolicy::Strict);
    copier.copy(&text, &mut bytes).unwrap();
    assert_eq!(bytes.data, "héllo".as_bytes());

    let mut back = TextBlob::default();
    copier.copy(&bytes, &mut back).unwrap();
    assert_eq!(back, text);
}

#[test]
fn copy_value_works_on_dynamic_values() {
    let copier = Copier::builder()
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();
    let from = S1 {
        id: "abc".to_string(),
        created_at: t1(),
    };
    let value = copier
        .copy_value(from.to_value(), S2::default().to_value(), &S2::shape())
        .unwrap();

    assert_eq!(
        S2::from_value(value).unwrap(),
        S2 {
            created_at: "2023-02-01T08:30:15Z".to_string(),
            ..S2::default()
        }
    );
}

#[test]
fn copier_is_shared_between_threads() {
    let copier = Copier::builder()
        .register_converter(converters::time_to_string())
        .build()
        .unwrap();

    std::thread::scope(|scope| {
        for day in 1..=4u32 {
            let copier = &copier;
            scope.spawn(move || {
                let from = S1 {
                    id: day.to_string(),
                    created_at: Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap(),
                };
                let mut to = S2::default();
                copier.copy(&from, &mut to).unwrap();
                assert_eq!(to.created_at, format!("2023-01-0{day}T00:00:00Z"));
            });
        }
    });
}
