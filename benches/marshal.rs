//! Benchmark: encode a user record to an attribute tree, decode it back, and parse the
//! mapping declarations the derive macros cache.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use scim_marshal::{marshal, unmarshal, Decode, Encode, FieldSpec, Resource};
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone, Encode, Decode)]
struct Name {
    given_name: String,
    family_name: String,
    formatted: String,
}

#[derive(Debug, Default, Clone, Encode, Decode)]
struct User {
    id: String,
    user_name: String,
    display_name: String,
    active: Option<bool>,
    name: Name,
    #[scim("emails.value,mV")]
    emails: Vec<String>,
    #[scim("emails.type,mV")]
    email_types: Vec<String>,
    #[scim("emails.primary,mV")]
    email_primary: Vec<bool>,
    #[scim("phoneNumbers.value,mV,i=0")]
    work_phone: String,
    #[scim("phoneNumbers.value,mV")]
    other_phones: Vec<String>,
    #[scim(",mV")]
    groups: Vec<String>,
    meta: BTreeMap<String, String>,
}

fn sample_user() -> User {
    User {
        id: "2819c223-7f76-453a-919d-413861904646".into(),
        user_name: "bjensen@example.com".into(),
        display_name: "Babs Jensen".into(),
        active: Some(true),
        name: Name {
            given_name: "Barbara".into(),
            family_name: "Jensen".into(),
            formatted: "Ms. Barbara J Jensen, III".into(),
        },
        emails: vec!["bjensen@example.com".into(), "babs@jensen.org".into()],
        email_types: vec!["work".into(), "home".into()],
        email_primary: vec![true, false],
        work_phone: "555-555-5555".into(),
        other_phones: vec!["555-555-4444".into(), "555-555-3333".into()],
        groups: (0..16).map(|i| format!("group-{}", i)).collect(),
        meta: BTreeMap::from([
            ("resourceType".to_string(), "User".to_string()),
            ("version".to_string(), "W/\"a330bc54f0671c9\"".to_string()),
        ]),
    }
}

fn bench_marshal(c: &mut Criterion) {
    let user = sample_user();
    let resource: Resource = match marshal(&user) {
        Ok(r) => r,
        Err(e) => panic!("sample user does not encode: {}", e),
    };
    eprintln!("marshal: {} top-level attributes, depth {}", resource.len(), resource.depth());

    c.bench_function("marshal_user", |b| {
        b.iter(|| black_box(marshal(black_box(&user))))
    });

    c.bench_function("unmarshal_user", |b| {
        b.iter(|| {
            let mut out = User::default();
            let _ = black_box(unmarshal(black_box(&resource), &mut out));
            out
        })
    });

    c.bench_function("marshal_unmarshal_user", |b| {
        b.iter(|| {
            let mut out = User::default();
            if let Ok(r) = marshal(black_box(&user)) {
                let _ = unmarshal(&r, &mut out);
            }
            out
        })
    });

    let decls = [
        "emails.value,mV",
        "phoneNumbers.value,mV,i=0;2-4",
        "complexMV.bool,mV,_mV,_i=1",
        ",0,!",
    ];
    c.bench_function("parse_declarations", |b| {
        b.iter(|| {
            for decl in &decls {
                let _ = black_box(FieldSpec::parse("field", Some(black_box(decl))));
            }
        })
    });
}

criterion_group!(benches, bench_marshal);
criterion_main!(benches);
