//! Build a sample document
//!
//! Writes a few pages exercising shapes, wrapped text, bands, watermarks,
//! images and links.
//!
//! Usage:
//!   cargo run --release --bin pagesmith-demo
//!   cargo run --release --bin pagesmith-demo -- --output demo.pdf --config page.json --image logo.png
//!   cargo run --release --bin pagesmith-demo -- --compress --pages 5

use pdf_pagesmith::config::PageConfig;
use pdf_pagesmith::geometry::{Insets, Point};
use pdf_pagesmith::writer::{
    Action, Alignment, Brush, Color, DashStyle, FillPattern, Font, FontFamily, FontStyle, ImageData, Layer,
    PaintMode, Page, Pen, PdfWriter, PdfWriterConfig, Unit,
};
use std::path::PathBuf;
use std::time::Instant;

const BODY: &str = "Every page keeps three layers of content: an underlay drawn first, the body, \
and an overlay drawn last. Text is wrapped greedily at blanks and broken inside words only when \
a single word is wider than the line. Justified lines stretch the gaps between words so both \
edges line up, except for the last line of a paragraph.";

struct DemoConfig {
    output: PathBuf,
    page_config: Option<PathBuf>,
    image: Option<PathBuf>,
    pages: usize,
    compress: bool,
}

impl DemoConfig {
    fn from_args() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut config = Self {
            output: PathBuf::from("pagesmith_demo.pdf"),
            page_config: None,
            image: None,
            pages: 3,
            compress: false,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--output" | "-o" => {
                    i += 1;
                    if i < args.len() {
                        config.output = PathBuf::from(&args[i]);
                    }
                },
                "--config" => {
                    i += 1;
                    if i < args.len() {
                        config.page_config = Some(PathBuf::from(&args[i]));
                    }
                },
                "--image" => {
                    i += 1;
                    if i < args.len() {
                        config.image = Some(PathBuf::from(&args[i]));
                    }
                },
                "--pages" => {
                    i += 1;
                    match args.get(i).map(|s| s.parse::<usize>()) {
                        Some(Ok(n)) if n > 0 => config.pages = n,
                        _ => eprintln!("Warning: --pages expects a positive number, keeping {}", config.pages),
                    }
                },
                "--compress" => {
                    config.compress = true;
                },
                other => {
                    eprintln!("Warning: ignoring unknown argument {}", other);
                },
            }
            i += 1;
        }
        config
    }
}

fn load_page_config(path: Option<&PathBuf>) -> pdf_pagesmith::Result<PageConfig> {
    match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)?;
            PageConfig::from_json(&json)
        },
        None => Ok(PageConfig::letter()
            .with_margins(Insets::uniform(54.0))
            .with_bands(36.0, 36.0)
            .with_font(FontFamily::Times, 11.0)),
    }
}

fn shapes_page(page: &mut Page) -> pdf_pagesmith::Result<()> {
    page.write_line("Shapes")?;
    page.set_pen(Pen::new(Color::rgb(0.1, 0.2, 0.6), 2.0));
    page.set_brush(Brush::solid(Color::gray(0.85)));
    page.draw_rect(0.0, 30.0, 150.0, 80.0, PaintMode::FillStroke)?;
    page.draw_round_rect(170.0, 30.0, 150.0, 80.0, 12.0, PaintMode::FillStroke)?;
    page.draw_ellipse(340.0, 30.0, 150.0, 80.0, PaintMode::Stroke)?;

    page.set_brush(Brush::hatched(Color::rgb(0.8, 0.1, 0.1), FillPattern::DiagonalCross));
    page.draw_pie(0.0, 130.0, 120.0, 120.0, 30.0, 300.0, PaintMode::FillStroke)?;
    page.draw_circle(230.0, 190.0, 60.0, PaintMode::Fill)?;

    page.set_pen(Pen::new(Color::BLACK, 1.0).with_dash(DashStyle::Dash));
    page.draw_arc(340.0, 130.0, 150.0, 120.0, 0.0, 180.0)?;
    page.draw_polygon(
        &[
            Point::new(0.0, 300.0),
            Point::new(80.0, 270.0),
            Point::new(160.0, 300.0),
            Point::new(80.0, 360.0),
        ],
        PaintMode::Stroke,
    )?;
    page.set_pen(Pen::new(Color::rgb(0.0, 0.5, 0.0), 1.5));
    page.draw_bezier(
        Point::new(200.0, 360.0),
        Point::new(260.0, 260.0),
        Point::new(340.0, 420.0),
        Point::new(480.0, 300.0),
    )?;
    Ok(())
}

fn text_page(page: &mut Page) -> pdf_pagesmith::Result<()> {
    page.set_font(page.font().with_style(FontStyle::BOLD).with_size(16.0));
    page.write_paragraph("Text layout", Alignment::Center)?;
    page.set_font(page.font().with_style(FontStyle::empty()).with_size(11.0));
    for alignment in [Alignment::Left, Alignment::Right, Alignment::Center, Alignment::Justify] {
        page.write_paragraph(BODY, alignment)?;
        page.new_line();
    }

    let mut inches = page.in_unit(Unit::Inch);
    inches.set_font(Font::new(FontFamily::Helvetica, 10.0).with_style(FontStyle::UNDERLINE));
    inches.write_text_in_rect("Rotated block", 4.5, 5.5, 2.0, 1.0, Alignment::Center, 30.0)?;
    let rest = inches.write_text_fitting(BODY, 0.0, 6.5, 3.0, 0.5, Alignment::Left)?;
    if let Some(rest) = rest {
        log::info!("{} characters did not fit the box", rest.chars().count());
    }
    Ok(())
}

fn decorate(page: &mut Page, index: usize, count: usize, image: Option<&ImageData>) -> pdf_pagesmith::Result<()> {
    page.add_header_text("pdf_pagesmith demo", Alignment::Left)?;
    page.add_footer_text(&format!("Page {} of {}", index + 1, count), Alignment::Right)?;
    page.add_watermark_text(
        "DRAFT",
        Font::new(FontFamily::Helvetica, 72.0).with_style(FontStyle::BOLD),
        Color::gray(0.9),
        45.0,
        Layer::Underlay,
    )?;
    if let Some(image) = image {
        page.add_header_image(image)?;
    }
    if index + 1 < count {
        page.add_link(0.0, 0.0, 100.0, 14.0, Action::GoToPage(index + 1))?;
    }
    Ok(())
}

fn run(config: &DemoConfig) -> pdf_pagesmith::Result<usize> {
    let page_config = load_page_config(config.page_config.as_ref())?;
    let image = config.image.as_ref().map(ImageData::from_file).transpose()?;

    let mut writer = PdfWriter::with_config(
        PdfWriterConfig::default()
            .with_title("pdf_pagesmith demo")
            .with_compress(config.compress),
    );
    for index in 0..config.pages {
        let page = writer.new_page(&page_config)?;
        match index % 2 {
            0 => shapes_page(page)?,
            _ => text_page(page)?,
        }
        decorate(page, index, config.pages, image.as_ref())?;
        if index == 0 {
            page.add_text_note(500.0, 0.0, "Generated by pagesmith-demo")?;
            page.set_open_action(Action::Named("FirstPage".to_string()))?;
        }
    }
    writer.save(&config.output)?;
    Ok(writer.page_count())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = DemoConfig::from_args();
    let start = Instant::now();
    match run(&config) {
        Ok(pages) => {
            println!(
                "Wrote {} pages to {} in {:.1}ms",
                pages,
                config.output.display(),
                start.elapsed().as_secs_f64() * 1000.0
            );
        },
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        },
    }
}
