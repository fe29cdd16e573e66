use csv::Writer;
use std::io::Write;

use super::view::ReconciliationView;

const HEADER: [&str; 7] = [
    "position",
    "target_id",
    "target_amount",
    "selected",
    "line_num",
    "source_amount",
    "description",
];

/// 按当前 Target Line 顺序导出配对结果，每行一条 Target Line
pub fn write_csv<W: Write>(view: &ReconciliationView, output: W) -> Result<(), csv::Error> {
    let mut writer = Writer::from_writer(output);
    writer.write_record(HEADER)?;

    for (position, target) in view.targets().iter().enumerate() {
        let source = view
            .mapping()
            .source_for(&target.id)
            .and_then(|line_num| view.sources().iter().find(|s| s.line_num == line_num));

        writer.write_record(&[
            position.to_string(),
            target.id.clone(),
            target.line_extension_amount.raw().to_string(),
            target.selected.to_string(),
            source.map(|s| s.line_num.to_string()).unwrap_or_default(),
            source.map(|s| s.line_total.raw().to_string()).unwrap_or_default(),
            source.map(|s| s.description.clone()).unwrap_or_default(),
        ])?;
    }

    writer.flush()?;
    Ok(())
}

/// 导出到内存
pub fn to_csv_bytes(view: &ReconciliationView) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = Vec::new();
    write_csv(view, &mut buffer)?;
    Ok(buffer)
}
