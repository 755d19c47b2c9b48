//! Table round-trips: every supported column type through the three row
//! sinks, ASCII tables, fixed arrays, and schema generation from record
//! types.

use std::collections::HashMap;
use std::io::Cursor;

use fitsrw::{fits_record, Cell, Column, File, HduKind, ImageHdu, TableHdu};

fn file_cycle(table: TableHdu) -> Vec<u8> {
    let mut buf = Vec::new();
    let mut f = File::create(&mut buf);
    f.write(ImageHdu::new_primary(8, &[]).unwrap()).unwrap();
    f.write(table).unwrap();
    f.close();
    buf
}

fn wide_table() -> (TableHdu, Vec<Vec<Cell>>) {
    let mut table = TableHdu::new(
        "everything",
        vec![
            Column::new("FLAG", "1L"),
            Column::new("BYTE", "1B"),
            Column::new("SHORT", "1I"),
            Column::new("USHORT", "1U"),
            Column::new("INT", "1J"),
            Column::new("UINT", "1V"),
            Column::new("LONG", "1K"),
            Column::new("ULONG", "1W"),
            Column::new("FLOAT", "1E"),
            Column::new("DOUBLE", "1D"),
            Column::new("CPLX", "1C"),
            Column::new("DCPLX", "1M"),
            Column::new("NAME", "10A"),
            Column::new("ARR", "3D"),
            Column::new("VLA", "QJ"),
        ],
        HduKind::BinaryTable,
    )
    .unwrap();

    let rows: Vec<Vec<Cell>> = (0..3)
        .map(|i| {
            vec![
                Cell::Bool(i % 2 == 0),
                Cell::U8(200 + i as u8),
                Cell::I16(-100 * i as i16),
                Cell::U16(60_000 + i as u16),
                Cell::I32(-70_000 * i as i32),
                Cell::U32(4_000_000_000 + i as u32),
                Cell::I64(i64::MIN + i as i64),
                Cell::U64(u64::MAX - i as u64),
                Cell::F32(0.5 * i as f32),
                Cell::F64(-2.25 * i as f64),
                Cell::C64(i as f32, -(i as f32)),
                Cell::C128(1.5 * i as f64, 2.5),
                Cell::Str(format!("row-{i}")),
                Cell::F64Vec(vec![i as f64, 1.0, 2.0]),
                Cell::I32Vec((0..=i as i32).collect()),
            ]
        })
        .collect();

    for row in &rows {
        table.push_row(row).unwrap();
    }
    (table, rows)
}

fn blank_row() -> Vec<Cell> {
    vec![
        Cell::Bool(false),
        Cell::U8(0),
        Cell::I16(0),
        Cell::U16(0),
        Cell::I32(0),
        Cell::U32(0),
        Cell::I64(0),
        Cell::U64(0),
        Cell::F32(0.0),
        Cell::F64(0.0),
        Cell::C64(0.0, 0.0),
        Cell::C128(0.0, 0.0),
        Cell::Str(String::new()),
        Cell::F64Vec(Vec::new()),
        Cell::I32Vec(Vec::new()),
    ]
}

#[test]
fn every_column_type_roundtrips_positionally() {
    let (table, rows) = wide_table();
    let buf = file_cycle(table);

    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("everything").unwrap().as_table().unwrap();
    assert_eq!(t.num_rows(), 3);
    assert_eq!(t.num_cols(), 15);

    let mut it = t.read(0, 3).unwrap();
    let mut cells = blank_row();
    let mut irow = 0;
    while it.next() {
        it.scan(&mut cells).unwrap();
        assert_eq!(cells, rows[irow], "row {irow}");
        irow += 1;
    }
    assert_eq!(irow, 3);
    assert!(it.err().is_none());
}

#[test]
fn keyed_map_sink_roundtrips() {
    let (table, rows) = wide_table();
    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("everything").unwrap().as_table().unwrap();

    // Empty map: every column comes back keyed by name.
    let mut it = t.read(1, 2).unwrap();
    assert!(it.next());
    let mut all = HashMap::new();
    it.scan_map(&mut all).unwrap();
    assert_eq!(all.len(), 15);
    assert_eq!(all.get("SHORT"), Some(&rows[1][2]));
    assert_eq!(all.get("NAME"), Some(&rows[1][12]));
    assert_eq!(all.get("VLA"), Some(&rows[1][14]));

    // Populated map: requested keys only, unknown keys untouched.
    let mut it = t.read(2, 3).unwrap();
    assert!(it.next());
    let mut some = HashMap::new();
    some.insert("DOUBLE".to_string(), Cell::F64(0.0));
    some.insert("NOPE".to_string(), Cell::Bool(true));
    it.scan_map(&mut some).unwrap();
    assert_eq!(some.len(), 2);
    assert_eq!(some.get("DOUBLE"), Some(&rows[2][9]));
    assert_eq!(some.get("NOPE"), Some(&Cell::Bool(true)));
}

fits_record! {
    struct WideRow {
        "INT" => int: i32,
        "DOUBLE" => double: f64,
        "NAME" => name: String,
        "ARR" => arr: [f64; 3],
        "VLA" => vla: Vec<i32>,
        "ABSENT" => absent: i64,
    }
}

#[test]
fn record_sink_roundtrips() {
    let (table, rows) = wide_table();
    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("everything").unwrap().as_table().unwrap();

    let mut it = t.read(0, 3).unwrap();
    let mut rec = WideRow {
        absent: -1,
        ..WideRow::default()
    };
    let mut irow = 0;
    while it.next() {
        it.scan_record(&mut rec).unwrap();
        assert_eq!(Cell::I32(rec.int), rows[irow][4]);
        assert_eq!(Cell::F64(rec.double), rows[irow][9]);
        assert_eq!(Cell::Str(rec.name.clone()), rows[irow][12]);
        assert_eq!(Cell::F64Vec(rec.arr.to_vec()), rows[irow][13]);
        assert_eq!(Cell::I32Vec(rec.vla.clone()), rows[irow][14]);
        assert_eq!(rec.absent, -1);
        irow += 1;
    }
    assert_eq!(irow, 3);
}

#[test]
fn record_write_path_roundtrips() {
    fits_record! {
        struct Obs {
            "T" => t: f64,
            "COUNT" => count: i32,
            "TAG" => tag: String,
        }
    }

    let mut table = TableHdu::from_record::<Obs>("obs", HduKind::BinaryTable).unwrap();
    let written = [
        Obs {
            t: 1.5,
            count: 3,
            tag: "a".into(),
        },
        Obs {
            t: -0.5,
            count: 9,
            tag: "bb".into(),
        },
    ];
    for o in &written {
        table.push_row_record(o).unwrap();
    }

    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("obs").unwrap().as_table().unwrap();

    let mut it = t.read(0, 2).unwrap();
    let mut rec = Obs::default();
    let mut got = Vec::new();
    while it.next() {
        it.scan_record(&mut rec).unwrap();
        got.push(rec.clone());
    }
    assert_eq!(got, written);
}

// ── ASCII tables ──

#[test]
fn ascii_table_decode_row_values() {
    // Mirrors the classic seven-column catalogue row: identifier, right
    // ascension, declination, type, diameter, inclination, velocity.
    let mut table = TableHdu::new(
        "catalog",
        vec![
            Column::new("IDEN.", "F9.2"),
            Column::new("RA", "F6.2"),
            Column::new("DEC", "F8.4"),
            Column::new("TYPE", "F4.1"),
            Column::new("D25", "F9.5"),
            Column::new("INCL.", "F5.1"),
            Column::new("RV", "F6.1"),
        ],
        HduKind::AsciiTable,
    )
    .unwrap();

    let row0 = [-1116.59, 11.28, 59.5667, 3.0, 77.89999, 12.0, 0.0];
    for scale in 0..10 {
        let cells: Vec<Cell> = row0
            .iter()
            .map(|v| Cell::F64(if scale == 0 { *v } else { v / scale as f64 }))
            .collect();
        table.push_row(&cells).unwrap();
    }

    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("catalog").unwrap().as_table().unwrap();
    assert_eq!(t.kind(), HduKind::AsciiTable);
    assert_eq!(t.num_rows(), 10);
    assert_eq!(t.num_cols(), 7);

    let mut it = t.read(0, 1).unwrap();
    assert!(it.next());
    let mut cells: Vec<Cell> = (0..7).map(|_| Cell::F64(0.0)).collect();
    it.scan(&mut cells).unwrap();
    for (cell, want) in cells.iter().zip(&row0) {
        let Cell::F64(got) = cell else {
            panic!("expected F64, got {cell:?}")
        };
        assert!((got - want).abs() < 1e-4, "{got} vs {want}");
    }
}

#[test]
fn ascii_table_mixed_types() {
    let mut table = TableHdu::new(
        "mixed",
        vec![
            Column::new("NAME", "A8"),
            Column::new("N", "I6"),
            Column::new("X", "E26.17"),
        ],
        HduKind::AsciiTable,
    )
    .unwrap();
    table
        .push_row(&[
            Cell::Str("M31".into()),
            Cell::I64(42),
            Cell::F64(2.6515958),
        ])
        .unwrap();

    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("mixed").unwrap().as_table().unwrap();
    assert_eq!(t.header().get_int("TBCOL2"), Some(9));

    let mut it = t.read(0, 1).unwrap();
    assert!(it.next());
    let mut cells = vec![Cell::Str(String::new()), Cell::I64(0), Cell::F64(0.0)];
    it.scan(&mut cells).unwrap();
    assert_eq!(cells[0], Cell::Str("M31".into()));
    assert_eq!(cells[1], Cell::I64(42));
    let Cell::F64(x) = cells[2] else { unreachable!() };
    assert!((x - 2.6515958).abs() < 1e-12);
}

// ── Fixed arrays ──

#[test]
fn binary_table_fixed_array_decode() {
    // The shape of an IUE low-dispersion spectrum table: per-order
    // scalars followed by 376-element float vectors.
    let npts = 376usize;
    let mut table = TableHdu::new(
        "spectrum",
        vec![
            Column::new("ORDER", "1I"),
            Column::new("NPTS", "1I"),
            Column::new("LAMBDA", "1E"),
            Column::new("DELTAW", "1E"),
            Column::new("GROSS", "376E"),
            Column::new("BACK", "376E"),
            Column::new("NET", "376E"),
        ],
        HduKind::BinaryTable,
    )
    .unwrap();

    let gross: Vec<f32> = (0..npts).map(|i| i as f32).collect();
    let back: Vec<f32> = (0..npts).map(|i| i as f32 * 0.5).collect();
    let net: Vec<f32> = gross.iter().zip(&back).map(|(g, b)| g - b).collect();
    table
        .push_row(&[
            Cell::I16(1),
            Cell::I16(npts as i16),
            Cell::F32(1000.8),
            Cell::F32(2.6515958),
            Cell::F32Vec(gross.clone()),
            Cell::F32Vec(back.clone()),
            Cell::F32Vec(net.clone()),
        ])
        .unwrap();

    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("spectrum").unwrap().as_table().unwrap();
    assert_eq!(t.header().axes()[0], 2 + 2 + 4 + 4 + 3 * 376 * 4);

    let mut it = t.read(0, 1).unwrap();
    assert!(it.next());
    let mut cells = vec![
        Cell::I16(0),
        Cell::I16(0),
        Cell::F32(0.0),
        Cell::F32(0.0),
        Cell::F32Vec(Vec::new()),
        Cell::F32Vec(Vec::new()),
        Cell::F32Vec(Vec::new()),
    ];
    it.scan(&mut cells).unwrap();
    assert_eq!(cells[0], Cell::I16(1));
    assert_eq!(cells[1], Cell::I16(376));
    let Cell::F32(lambda) = cells[2] else { unreachable!() };
    assert!((lambda - 1000.8).abs() < 1e-3);
    assert_eq!(cells[4], Cell::F32Vec(gross));
    assert_eq!(cells[5], Cell::F32Vec(back));
    assert_eq!(cells[6], Cell::F32Vec(net));
}

// ── Bit columns ──

#[test]
fn bit_column_roundtrip() {
    let mut table = TableHdu::new(
        "bits",
        vec![Column::new("MASK", "12X")],
        HduKind::BinaryTable,
    )
    .unwrap();
    // 12 bits pack into 2 bytes per row.
    assert_eq!(table.header().axes()[0], 2);
    table.push_row(&[Cell::U8Vec(vec![0b1010_1010, 0b1100_0000])]).unwrap();

    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("bits").unwrap().as_table().unwrap();
    let mut it = t.read(0, 1).unwrap();
    assert!(it.next());
    let mut cells = vec![Cell::U8Vec(Vec::new())];
    it.scan(&mut cells).unwrap();
    assert_eq!(cells[0], Cell::U8Vec(vec![0b1010_1010, 0b1100_0000]));
}

// ── Copies across files ──

#[test]
fn table_copy_through_files() {
    let (table, rows) = wide_table();
    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let src = f.get("everything").unwrap().as_table().unwrap();

    // Row-wise copy (the table has a VLA column, so offsets rebuild).
    let mut dst = TableHdu::new(
        "copy",
        src.cols().to_vec(),
        HduKind::BinaryTable,
    )
    .unwrap();
    fitsrw::copy_table(&mut dst, src).unwrap();
    assert_eq!(dst.num_rows(), 3);

    let out = file_cycle(dst);
    let f2 = File::open(&mut Cursor::new(&out)).unwrap();
    let t2 = f2.get("copy").unwrap().as_table().unwrap();
    let mut it = t2.read(0, 3).unwrap();
    let mut cells = blank_row();
    let mut irow = 0;
    while it.next() {
        it.scan(&mut cells).unwrap();
        assert_eq!(cells, rows[irow]);
        irow += 1;
    }
    assert_eq!(irow, 3);
}

#[test]
fn stride_read_through_file() {
    let mut table = TableHdu::new(
        "seq",
        vec![Column::new("N", "1J")],
        HduKind::BinaryTable,
    )
    .unwrap();
    for i in 0..10 {
        table.push_row(&[Cell::I32(i)]).unwrap();
    }
    let buf = file_cycle(table);
    let f = File::open(&mut Cursor::new(&buf)).unwrap();
    let t = f.get("seq").unwrap().as_table().unwrap();

    let mut it = t.read_range(1, 8, 3).unwrap();
    let mut got = Vec::new();
    let mut cells = vec![Cell::I32(0)];
    while it.next() {
        it.scan(&mut cells).unwrap();
        if let Cell::I32(n) = cells[0] {
            got.push(n);
        }
    }
    assert_eq!(got, vec![1, 4, 7]);
}
