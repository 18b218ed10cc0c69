//! Platforms command

use cfpack_schema::PLATFORMS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{ContentArrangement, Table};

/// Print the supported platform table.
pub fn platforms(quiet: bool) {
    if quiet {
        for platform in &PLATFORMS {
            println!("{}", platform.platform_id);
        }
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec!["Platform", "Package", "Release", "Archive", "Binary"]);

    for platform in &PLATFORMS {
        table.add_row(vec![
            platform.platform_id.to_string(),
            platform.package_id(),
            platform.release_channel.to_string(),
            platform.archive_format.to_string(),
            platform.binary_name.to_string(),
        ]);
    }
    println!("{table}");
}
