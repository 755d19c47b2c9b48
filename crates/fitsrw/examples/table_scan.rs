//! Create a binary table with a variable-length column, then iterate it
//! with the three row sinks: positional cells, a keyed map, and a record
//! struct.

use std::collections::HashMap;
use std::io::Cursor;

use fitsrw::{fits_record, Cell, Column, File, HduKind, ImageHdu, Result, TableHdu};

fits_record! {
    pub struct Event {
        "ID" => id: i32,
        "ENERGY" => energy: f64,
        "SAMPLES" => samples: Vec<f32>,
    }
}

fn main() -> Result<()> {
    let mut buf = Vec::new();

    {
        let mut out = File::create(&mut buf);
        out.write(ImageHdu::new_primary(8, &[])?)?;

        let mut table = TableHdu::new(
            "EVENTS",
            vec![
                Column::new("ID", "1J"),
                Column::new("ENERGY", "1D"),
                Column::new("SAMPLES", "QE"),
            ],
            HduKind::BinaryTable,
        )?;
        for i in 0..4 {
            table.push_row(&[
                Cell::I32(i),
                Cell::F64(1.5 * i as f64),
                Cell::F32Vec((0..=i).map(|k| k as f32).collect()),
            ])?;
        }
        out.write(table)?;
        out.close();
    }

    let file = File::open(&mut Cursor::new(&buf))?;
    let table = file.get("EVENTS").expect("table present").as_table().unwrap();
    println!(
        "table {:?}: {} rows x {} cols",
        "EVENTS",
        table.num_rows(),
        table.num_cols()
    );

    // Positional cells.
    let mut rows = table.read(0, table.num_rows() as i64)?;
    let mut cells = vec![Cell::I32(0), Cell::F64(0.0), Cell::F32Vec(Vec::new())];
    while rows.next() {
        rows.scan(&mut cells)?;
        println!("positional: {cells:?}");
    }

    // Keyed map, restricted to one column.
    let mut rows = table.read(0, 2)?;
    let mut wanted = HashMap::from([("ENERGY".to_string(), Cell::F64(0.0))]);
    while rows.next() {
        rows.scan_map(&mut wanted)?;
        println!("map: {wanted:?}");
    }

    // Record struct.
    let mut rows = table.read(0, table.num_rows() as i64)?;
    let mut event = Event::default();
    while rows.next() {
        rows.scan_record(&mut event)?;
        println!(
            "record: id={} energy={} samples={:?}",
            event.id, event.energy, event.samples
        );
    }

    Ok(())
}
