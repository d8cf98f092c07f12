//! Output formatters

use ocelint_core::{Grouped, grouped_to_json};

use crate::cli::OutputFormat;

pub fn output_results(grouped: &Grouped, format: OutputFormat, files_checked: usize) {
    match format {
        OutputFormat::Text => output_text(grouped, files_checked),
        OutputFormat::Json => println!("{}", grouped_to_json(grouped)),
    }
}

fn output_text(grouped: &Grouped, files_checked: usize) {
    for (key, reports) in grouped {
        println!("{key}:");
        for entry in reports {
            let report = &entry.report;
            match &entry.plugin {
                Some(plugin) => println!(
                    "  {}:{}:{} [{}::{}]",
                    report.file, report.line, report.column, plugin, report.code
                ),
                None => println!(
                    "  {}:{}:{} [{}]",
                    report.file, report.line, report.column, report.code
                ),
            }
            if let Some(annotation) = &report.annotation {
                println!("      {annotation}");
            }
        }
    }

    let total: usize = grouped.values().map(Vec::len).sum();
    println!();
    println!("Checked {files_checked} files, found {total} issues");
}
