use clap::{Arg, Command};
use doclingua::{DocumentFormat, DocxDocument, extract};
use serde_json::json;
use std::fs;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let matches = Command::new("doclingua")
        .version("0.1.0")
        .about("Inspect the translatable text of a document")
        .arg(
            Arg::new("file")
                .help("Document to inspect (.docx, .pdf or .pptx)")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Print fragments and document shape as JSON")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("text")
                .long("text")
                .short('t')
                .help("Print the document as plain text, one paragraph per line")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("json"),
        )
        .get_matches();

    let path = matches
        .get_one::<String>("file")
        .ok_or("missing file argument")?;
    let as_json = matches.get_flag("json");
    let as_text = matches.get_flag("text");
    let bytes = fs::read(path)?;

    let format = match DocumentFormat::detect(path, None) {
        Some(format) => format,
        None => {
            eprintln!("❌ Unsupported file type: {}", path);
            eprintln!("   Supported: .docx, .pdf, .pptx");
            return Err("unsupported file type".into());
        }
    };

    if format.is_image() {
        eprintln!("❌ Images have no text layer; use doclingua-mt to translate them");
        return Err("image input".into());
    }

    match format {
        DocumentFormat::Docx if as_text => {
            println!("{}", extract::docx_text(&bytes)?);
        }
        DocumentFormat::Docx => {
            let document = DocxDocument::parse(&bytes)?;
            let fragments = document.fragments();
            if as_json {
                let items: Vec<_> = fragments
                    .iter()
                    .map(|f| json!({ "paragraph": f.handle.index(), "text": f.text }))
                    .collect();
                let output = json!({
                    "part": document.part_name(),
                    "shape": document.shape(),
                    "fragments": items,
                });
                println!("{}", serde_json::to_string_pretty(&output)?);
            } else {
                let shape = document.shape();
                println!(
                    "📄 {} ({} paragraphs, {} tables, {} cells)",
                    document.part_name(),
                    shape.paragraphs,
                    shape.tables,
                    shape.cells
                );
                for (i, fragment) in fragments.iter().enumerate() {
                    println!("   [{}] \"{}\"", i, fragment.text);
                }
            }
        }
        DocumentFormat::Pdf | DocumentFormat::Pptx => {
            let text = if format == DocumentFormat::Pdf {
                extract::pdf_text(&bytes)?
            } else {
                extract::slide_text(&bytes)?
            };
            if as_json {
                println!("{}", serde_json::to_string_pretty(&json!({ "format": format, "text": text }))?);
            } else {
                println!("{}", text);
            }
        }
        // Rejected above
        DocumentFormat::Png | DocumentFormat::Jpeg => {}
    }

    Ok(())
}
