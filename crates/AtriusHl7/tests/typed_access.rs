#![cfg(all(feature = "V2_1", feature = "V2_3", feature = "V2_4"))]

use atrius_hl7_lib::access::SegmentView;
use atrius_hl7_lib::date_time::{DatePrecision, DateTimePrecision};
use atrius_hl7_lib::{
    AccessError, FieldContainer, IssueKind, Message, ModelRegistry, Parser, ValidationIssue,
    v2_1, v2_3, v2_4,
};
use chrono::FixedOffset;
use rust_decimal_macros::dec;

fn parse(text: &str) -> Message {
    let registry = ModelRegistry::with_enabled_versions();
    Parser::new(&registry).parse(text).unwrap()
}

fn adt_v2_1() -> Message {
    parse(include_str!("data/adt_a01_v2_1.hl7"))
}

fn oru_v2_3() -> Message {
    parse(include_str!("data/oru_r01_v2_3.hl7"))
}

fn orm_v2_4() -> Message {
    parse(include_str!("data/orm_o01_v2_4.hl7"))
}

#[test]
fn adt_v2_1_single_and_bounded_fields() {
    let message = adt_v2_1();
    let adt: v2_1::messages::AdtA01 = message.view().unwrap();

    let msh = adt.msh().unwrap();
    let message_type = msh.message_type().unwrap();
    assert_eq!(message_type.message_type().and_then(|t| t.value()), Some("ADT"));
    assert_eq!(message_type.trigger_event().and_then(|t| t.value()), Some("A01"));
    let sent = msh.date_time_of_message().unwrap().to_datetime().unwrap().unwrap();
    assert_eq!(sent.precision(), DateTimePrecision::DateHourMinute);
    assert_eq!((sent.year(), sent.month(), sent.minute()), (1988, Some(8), Some(26)));

    let pid = adt.pid().unwrap();
    let name = pid.patient_name().unwrap();
    assert_eq!(name.family_name().and_then(|n| n.value()), Some("JONES"));
    assert_eq!(name.given_name().and_then(|n| n.value()), Some("WILLIAM"));

    let internal_id = pid.patient_id_internal_id().unwrap();
    assert_eq!(
        internal_id.id_number().unwrap().to_decimal().unwrap(),
        Some(dec!(1234))
    );

    let birth = pid.date_of_birth().unwrap().to_date().unwrap().unwrap();
    assert_eq!(birth.precision(), DatePrecision::Full);
    assert_eq!((birth.year(), birth.month(), birth.day()), (1961, Some(6), Some(15)));

    let address = pid.patient_address().unwrap();
    assert_eq!(address.city().and_then(|c| c.value()), Some("GREENSBORO"));
    assert_eq!(address.r#type().and_then(|t| t.value()), Some("H"));

    assert_eq!(pid.patient_alias_count(), 2);
    assert_eq!(
        pid.patient_alias_rep(1)
            .and_then(|alias| alias.given_name())
            .and_then(|n| n.value()),
        Some("BILLY")
    );

    assert_eq!(pid.phone_number_home_count(), 2);
    assert_eq!(
        pid.phone_number_home_rep(1).and_then(|p| p.value()),
        Some("(919)555-0000")
    );
    // Declared but not present
    assert_eq!(pid.phone_number_home_rep(2), None);

    assert_eq!(adt.nk1_count(), 2);
    let relationships: Vec<_> = adt
        .nk1_all()
        .iter()
        .filter_map(|nk1| nk1.next_of_kin_relationship())
        .filter_map(|r| r.value())
        .collect();
    assert_eq!(relationships, vec!["WIFE", "SON"]);

    assert!(message.validate().is_empty(), "{:?}", message.validate());
}

#[test]
#[should_panic(expected = "PID-13 admits 3 repetition(s), index 3 requested")]
fn repetition_beyond_bounded_maximum_panics() {
    let message = adt_v2_1();
    let adt: v2_1::messages::AdtA01 = message.view().unwrap();
    adt.pid().unwrap().phone_number_home_rep(3);
}

#[test]
fn undeclared_positions_are_access_errors() {
    let message = adt_v2_1();
    let adt: v2_1::messages::AdtA01 = message.view().unwrap();
    let pid = adt.pid().unwrap().segment();

    assert!(matches!(
        pid.try_field(21, 0),
        Err(AccessError::FieldOutOfRange { segment: "PID", position: 21, declared: 20 })
    ));
    assert!(matches!(
        pid.try_field(5, 1),
        Err(AccessError::RepetitionOutOfRange { position: 5, rep: 1, max: 1, .. })
    ));
    assert_eq!(pid.try_field(4, 0), Ok(None));
}

#[test]
fn views_only_bind_to_their_own_version() {
    let message = adt_v2_1();
    assert!(message.view::<v2_1::messages::AdtA01>().is_some());
    assert!(message.view::<v2_3::messages::AdtA01>().is_none());
    assert!(message.view::<v2_1::messages::OruR01>().is_none());

    let adt: v2_1::messages::AdtA01 = message.view().unwrap();
    let segment = adt.pid().unwrap().segment();
    assert!(v2_1::segments::Pid::try_from_segment(segment).is_some());
    assert!(v2_3::segments::Pid::try_from_segment(segment).is_none());
}

#[test]
fn oru_v2_3_nested_groups() {
    let message = oru_v2_3();
    let oru: v2_3::messages::OruR01 = message.view().unwrap();

    let sent = oru
        .msh()
        .and_then(|msh| msh.date_time_of_message())
        .and_then(|ts| ts.time_of_an_event())
        .unwrap()
        .to_datetime()
        .unwrap()
        .unwrap();
    assert_eq!(sent.precision(), DateTimePrecision::DateHourMinuteSecond);
    assert_eq!(sent.offset(), FixedOffset::east_opt(3600));

    assert_eq!(oru.patient_result_count(), 1);
    let result = oru.patient_result().unwrap();

    let patient = result.patient().unwrap();
    assert_eq!(patient.nte_count(), 1);
    assert!(patient.pv1().is_some());

    let pid = patient.pid().unwrap();
    let name = pid.patient_name_rep(0).unwrap();
    assert_eq!(name.family_name().and_then(|n| n.value()), Some("DOE"));
    assert_eq!(name.component(3).and_then(|c| c.text()), Some("Q"));

    let ids = pid.patient_id_internal_id_all();
    assert_eq!(ids.len(), pid.patient_id_internal_id_count());
    for (rep, id) in ids.iter().enumerate() {
        assert_eq!(Some(*id), pid.patient_id_internal_id_rep(rep));
    }
    assert_eq!(
        ids[1]
            .assigning_authority()
            .and_then(|hd| hd.namespace_id())
            .and_then(|ns| ns.value()),
        Some("CLINIC")
    );
    // Unbounded fields never panic on the index
    assert_eq!(pid.phone_number_home_rep(50), None);

    let birth = pid
        .date_time_of_birth()
        .and_then(|ts| ts.time_of_an_event())
        .unwrap()
        .to_datetime()
        .unwrap()
        .unwrap();
    assert_eq!(birth.precision(), DateTimePrecision::Date);

    let orders = result.order_observation_all();
    assert_eq!(orders.len(), result.order_observation_count());
    assert_eq!(orders.len(), 2);
    for (rep, order) in orders.iter().enumerate() {
        assert_eq!(Some(*order), result.order_observation_rep(rep));
    }
    assert_eq!(result.order_observation_rep(2), None);

    let first = orders[0];
    assert_eq!(
        first
            .obr()
            .and_then(|obr| obr.placer_order_number())
            .and_then(|ei| ei.entity_identifier())
            .and_then(|e| e.value()),
        Some("ORD1")
    );
    assert_eq!(first.observation_count(), 2);
    let glucose = first.observation_rep(0).unwrap();
    assert_eq!(glucose.nte_count(), 1);
    let obx = glucose.obx().unwrap();
    assert_eq!(obx.set_id_obx().unwrap().to_decimal().unwrap(), Some(dec!(1)));
    assert_eq!(
        obx.observation_value().and_then(|v| v.value()),
        Some("5.4")
    );
    assert_eq!(
        obx.units().and_then(|u| u.identifier()).and_then(|u| u.value()),
        Some("mmol/L")
    );
    assert_eq!(first.observation_rep(1).unwrap().nte_count(), 0);

    assert_eq!(orders[1].observation_count(), 1);

    assert_eq!(message.unplaced().len(), 1);
    assert_eq!(
        message.validate(),
        vec![ValidationIssue {
            location: "ORU_R01/ZDS".to_string(),
            kind: IssueKind::UnplacedSegment,
        }]
    );
}

#[test]
#[should_panic(expected = "XPN has no component 99")]
fn undeclared_component_panics() {
    let message = oru_v2_3();
    let oru: v2_3::messages::OruR01 = message.view().unwrap();
    let pid = oru.patient_result().unwrap().patient().unwrap().pid().unwrap();
    pid.patient_name().unwrap().component(99);
}

#[test]
fn orm_v2_4_structure_from_msh_9_3() {
    let message = orm_v2_4();
    assert_eq!(message.spec().name, "ORM_O01");
    let orm: v2_4::messages::OrmO01 = message.view().unwrap();

    let msh = orm.msh().unwrap();
    let message_type = msh.message_type().unwrap();
    assert_eq!(
        message_type.message_structure().and_then(|s| s.value()),
        Some("ORM_O01")
    );
    assert_eq!(
        msh.version_id()
            .and_then(|vid| vid.version_id())
            .and_then(|v| v.value()),
        Some("2.4")
    );

    assert_eq!(orm.nte_count(), 1);
    assert!(orm.patient().and_then(|p| p.pv1()).is_some());

    assert_eq!(orm.order_count(), 2);
    let first = orm.order_rep(0).and_then(|o| o.order_detail()).unwrap();
    assert_eq!(first.nte_count(), 1);
    assert_eq!(first.observation_count(), 0);
    let second = orm.order_rep(1).and_then(|o| o.order_detail()).unwrap();
    assert_eq!(
        second
            .obr()
            .and_then(|obr| obr.universal_service_id())
            .and_then(|ce| ce.text())
            .and_then(|t| t.value()),
        Some("Basic metabolic panel")
    );

    // MSG with all three components fills its 15 characters exactly
    assert_eq!(msh.segment().spec().field(9).and_then(|f| f.max_length), Some(15));
    assert!(message.validate().is_empty(), "{:?}", message.validate());
}

#[test]
fn obr_field_tables_differ_across_versions() {
    let v21 = parse(
        "MSH|^~\\&|LAB||||||ORU^R01|1|P|2.1\rPID|||1||DOE\rOBR|1|||GLU\rOBX||NM|GLU||5\r",
    );
    let v23 = parse(
        "MSH|^~\\&|LAB||||||ORU^R01|1|P|2.3\rPID|||1||DOE\rOBR|1|||GLU\rOBX|||GLU||5||||||F\r",
    );

    let obr21 = v21
        .view::<v2_1::messages::OruR01>()
        .and_then(|oru| oru.patient_result())
        .and_then(|r| r.order_observation())
        .and_then(|o| o.obr())
        .unwrap();
    let obr23 = v23
        .view::<v2_3::messages::OruR01>()
        .and_then(|oru| oru.patient_result())
        .and_then(|r| r.order_observation())
        .and_then(|o| o.obr())
        .unwrap();

    assert_eq!(obr21.segment().spec().fields.len(), 36);
    assert_eq!(obr23.segment().spec().fields.len(), 43);
    assert!(obr23.segment().try_field(43, 0).is_ok());
    assert!(obr21.segment().try_field(43, 0).is_err());
}
