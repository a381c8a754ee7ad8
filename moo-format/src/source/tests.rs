//! Tests for JSON source normalization

use super::*;

const ADD_AX_BX: &str = r#"[
  {
    "idx": 7,
    "name": "add ax, bx",
    "bytes": [1, 216],
    "initial": {
      "regs": { "ax": 1, "bx": 2, "ip": 256 },
      "ram": [[256, 1], [257, 216]],
      "queue": []
    },
    "final": {
      "regs": { "ax": 3, "ip": 258 },
      "ram": [],
      "queue": [144]
    },
    "cycles": [
      [1, 256, "CS", "R--", "---", 0, 1, "CODE", "T1", "F", 1],
      [0, 257, "ZZ", "---", "---", 1, 216, "BOGUS", "T9", "?", 0]
    ],
    "hash": "00112233445566778899aabbccddeeff"
  }
]"#;

fn parse_one(json: &str) -> SourceTest {
    let mut tests = parse_source_tests(json).unwrap();
    assert_eq!(tests.len(), 1);
    tests.remove(0)
}

fn lenient() -> SourceOptions {
    SourceOptions::default()
}

fn strict() -> SourceOptions {
    SourceOptions {
        strict_registers: true,
    }
}

#[test]
fn test_normalize_corpus_test() {
    let test = parse_one(ADD_AX_BX);
    let (record, warnings) = normalize_test(&test, &lenient()).unwrap();

    assert!(warnings.is_empty());
    assert_eq!(record.index, 7);
    assert_eq!(record.name, "add ax, bx");
    assert_eq!(record.instruction_bytes, [0x01, 0xD8]);

    let init = &record.initial_state;
    assert_eq!(init.registers.len(), 3);
    assert_eq!(init.registers.get(Register::Ax), Some(1));
    assert_eq!(init.registers.get(Register::Bx), Some(2));
    assert_eq!(init.registers.get(Register::Ip), Some(256));
    assert_eq!(init.ram, [RamEntry::new(256, 1), RamEntry::new(257, 216)]);
    assert!(init.queue.is_empty());

    let fina = &record.final_state;
    assert_eq!(fina.registers.get(Register::Bx), None);
    assert_eq!(fina.queue, [0x90]);

    assert_eq!(
        record.hash,
        Some([
            0x00, 0x11, 0x22, 0x33, 0x44, 0x55, 0x66, 0x77, 0x88, 0x99, 0xAA, 0xBB, 0xCC, 0xDD,
            0xEE, 0xFF
        ])
    );
}

#[test]
fn test_normalize_cycles() {
    let test = parse_one(ADD_AX_BX);
    let (record, _) = normalize_test(&test, &lenient()).unwrap();

    assert_eq!(
        record.cycles[0],
        CycleEntry {
            pins: 1,
            address: 256,
            segment: Segment::Cs,
            memory: BusFlags::from_bits(0b100),
            io: BusFlags::from_bits(0),
            bhe: 0,
            data: 1,
            bus: BusStatus::Code,
            t_state: TState::T1,
            queue_op: QueueOp::Fetch,
            queue_byte: 1,
        }
    );

    // Unrecognized codes take each table's fallback
    let fallback = &record.cycles[1];
    assert_eq!(fallback.segment, Segment::Unknown);
    assert_eq!(fallback.segment.to_byte(), 4);
    assert_eq!(fallback.bus, BusStatus::Passive);
    assert_eq!(fallback.t_state, TState::Ti);
    assert_eq!(fallback.queue_op, QueueOp::Idle);
}

#[test]
fn test_pins_as_flag_string() {
    let json = r#"[{
        "name": "nop", "initial": {}, "final": {},
        "cycles": [["A-R", 0, "--", "---", "---", 0, 0, "PASV", "Ti", "-", 0]]
    }]"#;
    let (record, _) = normalize_test(&parse_one(json), &lenient()).unwrap();
    assert_eq!(record.cycles[0].pins, 0b101);
}

#[test]
fn test_non_string_codes_fall_back() {
    let json = r#"[{
        "name": "nop", "initial": {}, "final": {},
        "cycles": [[0, 16, null, null, 5, 0, 0, 7, null, 1, 0]]
    }]"#;
    let test = parse_one(json);
    assert_eq!(test.cycles[0].2, SourceCode::Other(Value::Null));

    let (record, warnings) = normalize_test(&test, &lenient()).unwrap();
    assert!(warnings.is_empty());
    let cycle = &record.cycles[0];
    assert_eq!(cycle.address, 16);
    assert_eq!(cycle.segment, Segment::Unknown);
    assert_eq!(cycle.memory, BusFlags::default());
    assert_eq!(cycle.io, BusFlags::default());
    assert_eq!(cycle.bus, BusStatus::Passive);
    assert_eq!(cycle.t_state, TState::Ti);
    assert_eq!(cycle.queue_op, QueueOp::Idle);

    // Exported with canonical codes
    let exported = to_source_test(&record);
    assert_eq!(exported.cycles[0].2, "--");
    assert_eq!(exported.cycles[0].7, "PASV");
}

#[test]
fn test_optional_fields_default() {
    let json = r#"[{ "name": "hlt", "initial": {}, "final": {} }]"#;
    let test = parse_one(json);
    assert_eq!(test.idx, 0);
    assert!(test.hash.is_none());

    let (record, warnings) = normalize_test(&test, &lenient()).unwrap();
    assert!(warnings.is_empty());
    assert!(record.instruction_bytes.is_empty());
    assert!(record.cycles.is_empty());
    assert_eq!(record.initial_state, CpuState::default());
    assert_eq!(record.hash, None);
}

#[test]
fn test_unknown_register_lenient() {
    let json = r#"[{
        "idx": 3, "name": "mov eax, 1",
        "initial": { "regs": { "ax": 1, "eax": 1 } },
        "final": {}
    }]"#;
    let (record, warnings) = normalize_test(&parse_one(json), &lenient()).unwrap();

    assert_eq!(record.initial_state.registers.len(), 1);
    assert_eq!(
        warnings,
        [SourceWarning {
            index: 3,
            kind: SourceWarningKind::UnknownRegister {
                role: StateRole::Initial,
                name: "eax".into(),
            },
        }]
    );
    assert_eq!(
        warnings[0].to_string(),
        "test 3: dropping unknown register 'eax' in 'initial' state"
    );
}

#[test]
fn test_unknown_register_strict() {
    let json = r#"[{
        "idx": 3, "name": "mov eax, 1",
        "initial": {},
        "final": { "regs": { "eax": 1 } }
    }]"#;
    let err = normalize_test(&parse_one(json), &strict()).unwrap_err();
    assert!(matches!(
        err,
        MooError::Source {
            index: 3,
            kind: SourceErrorKind::UnknownRegister(ref name),
        } if name == "eax"
    ));
}

#[test]
fn test_malformed_state_uses_empty_default() {
    let json = r#"[{
        "idx": 1, "name": "nop",
        "initial": [1, 2, 3],
        "final": { "regs": { "ax": "not a number" } }
    }]"#;
    let (record, warnings) = normalize_test(&parse_one(json), &lenient()).unwrap();

    assert_eq!(record.initial_state, CpuState::default());
    assert_eq!(record.final_state, CpuState::default());
    let kinds: Vec<_> = warnings.into_iter().map(|w| w.kind).collect();
    assert_eq!(
        kinds,
        [
            SourceWarningKind::MalformedState {
                role: StateRole::Initial
            },
            SourceWarningKind::MalformedState {
                role: StateRole::Final
            },
        ]
    );
}

#[test]
fn test_missing_state_is_malformed() {
    let json = r#"[{ "name": "nop", "initial": {} }]"#;
    let (_, warnings) = normalize_test(&parse_one(json), &lenient()).unwrap();
    assert_eq!(
        warnings[0].kind,
        SourceWarningKind::MalformedState {
            role: StateRole::Final
        }
    );
}

#[test]
fn test_malformed_ram_entries_skipped() {
    let json = r#"[{
        "name": "nop",
        "initial": { "ram": [[1, 2], [3], "x", [4, 300], [5, 6, 7], [8, 9]] },
        "final": {}
    }]"#;
    let (record, warnings) = normalize_test(&parse_one(json), &lenient()).unwrap();

    assert_eq!(
        record.initial_state.ram,
        [RamEntry::new(1, 2), RamEntry::new(8, 9)]
    );
    let positions: Vec<_> = warnings
        .iter()
        .map(|w| match w.kind {
            SourceWarningKind::MalformedRamEntry { position, .. } => position,
            ref other => panic!("unexpected warning {other:?}"),
        })
        .collect();
    assert_eq!(positions, [1, 2, 3, 4]);
}

#[test]
fn test_invalid_hash() {
    for hash in ["xyz", "0011", "00112233445566778899aabbccddeeff00112233"] {
        let json = format!(
            r#"[{{ "idx": 2, "name": "nop", "initial": {{}}, "final": {{}}, "hash": "{hash}" }}]"#
        );
        let err = normalize_test(&parse_one(&json), &lenient()).unwrap_err();
        assert!(
            matches!(
                err,
                MooError::Source {
                    index: 2,
                    kind: SourceErrorKind::InvalidHash(_),
                }
            ),
            "{hash}: {err}"
        );
    }
}

#[test]
fn test_normalize_tests_collects_warnings() {
    let json = r#"[
        { "idx": 0, "name": "a", "initial": {}, "final": {} },
        { "idx": 1, "name": "b", "initial": null, "final": {} },
        { "idx": 2, "name": "c", "initial": {}, "final": 5 }
    ]"#;
    let tests = parse_source_tests(json).unwrap();
    let (records, warnings) = normalize_tests(&tests, &lenient()).unwrap();

    assert_eq!(records.len(), 3);
    let names: Vec<_> = records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["a", "b", "c"]);
    let indices: Vec<_> = warnings.iter().map(|w| w.index).collect();
    assert_eq!(indices, [1, 2]);
}

#[test]
fn test_read_source_tests() {
    let tests = read_source_tests(ADD_AX_BX.as_bytes()).unwrap();
    assert_eq!(tests.len(), 1);
    assert_eq!(tests[0].cycles.len(), 2);

    assert!(matches!(
        read_source_tests(&b"{ not json"[..]),
        Err(MooError::Json(_))
    ));
}

#[test]
fn test_export_round_trip() {
    let (record, _) = normalize_test(&parse_one(ADD_AX_BX), &lenient()).unwrap();
    let exported = to_source_test(&record);

    assert_eq!(
        exported.hash.as_deref(),
        Some("00112233445566778899aabbccddeeff")
    );
    assert_eq!(exported.initial["regs"]["ax"], 1);
    assert_eq!(exported.initial["ram"][1], json!([257, 216]));
    // Fallback values are exported with their canonical codes
    assert_eq!(exported.cycles[1].2, "--");
    assert_eq!(exported.cycles[1].7, "PASV");

    let (again, warnings) = normalize_test(&exported, &strict()).unwrap();
    assert!(warnings.is_empty());
    assert_eq!(again, record);
}

#[test]
fn test_export_serializes_final_key() {
    let exported = to_source_test(&TestRecord::default());
    let value = serde_json::to_value(&exported).unwrap();

    assert!(value.get("final").is_some());
    assert!(value.get("hash").is_none());
    assert_eq!(value["cycles"], json!([]));
}
