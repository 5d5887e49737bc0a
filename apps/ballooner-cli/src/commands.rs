use crate::{AddArgs, Command, Description, PointArg};
use anyhow::{bail, Context, Result};
use ballooner_core::coords::{normalize_rotation, render_scale, ScreenPoint};
use ballooner_core::export::{self, drawing_name, ExportFormat};
use ballooner_core::gdt::{Dimension, FeatureControlFrame, SurfaceFinish, ZoneModifiers};
use ballooner_core::table;
use ballooner_core::viewer::PointerButton;
use ballooner_core::{
    inspect, sidecar_path, Balloon, BalloonError, Config, DocPoint, PageGeometry, Session, Sheet,
    ViewMode, ViewerEvent,
};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A PDF together with its loaded session
struct Project {
    pdf: PathBuf,
    session_path: PathBuf,
    pages: Vec<PageGeometry>,
    session: Session,
    sheet: Sheet,
}

impl Project {
    fn open(pdf: &Path, session_override: Option<&Path>, config: &Config) -> Result<Self> {
        let bytes = std::fs::read(pdf).with_context(|| format!("Failed to read PDF: {}", pdf.display()))?;
        let pages = inspect(&bytes).with_context(|| format!("Not a readable PDF: {}", pdf.display()))?;
        let session_path = session_override
            .map(Path::to_path_buf)
            .unwrap_or_else(|| sidecar_path(pdf));

        let session = if session_path.exists() {
            Session::load(&session_path)
                .with_context(|| format!("Failed to load session: {}", session_path.display()))?
        } else {
            tracing::debug!(path = %session_path.display(), "no session yet, starting empty");
            Session::new(pdf)
        };

        let mut sheet = Sheet::new(config.placement.defaults());
        if config.placement.undo_limit > 0 {
            sheet = sheet.with_history_limit(config.placement.undo_limit);
        }
        session.apply_to(&mut sheet);

        Ok(Self {
            pdf: pdf.to_path_buf(),
            session_path,
            pages,
            session,
            sheet,
        })
    }

    /// Convert a 1-based page argument and check it against the document.
    fn page_index(&self, page: u32) -> Result<u32> {
        let count = self.pages.len() as u32;
        if page == 0 || page > count {
            return Err(BalloonError::InvalidPage { page, count }.into());
        }
        Ok(page - 1)
    }

    fn find(&self, number: u32, page: Option<u32>) -> Result<Uuid> {
        let page = page.map(|p| self.page_index(p)).transpose()?;
        self.sheet
            .by_number(page, number)
            .map(|b| b.uid)
            .with_context(|| match page {
                Some(p) => format!("No balloon #{} on page {}", number, p + 1),
                None => format!("No balloon #{}", number),
            })
    }

    fn save(&mut self) -> Result<()> {
        let rotations = self.session.page_rotations.clone();
        let gdt = std::mem::take(&mut self.session.gdt);
        self.session = Session::from_sheet(&self.pdf, &self.sheet).with_rotations(&rotations);
        self.session.gdt = gdt;
        self.session
            .save(&self.session_path)
            .with_context(|| format!("Failed to write session: {}", self.session_path.display()))?;
        self.sheet.mark_saved();
        Ok(())
    }
}

pub fn run(command: Command, config: &Config, session: Option<&Path>) -> Result<String> {
    match command {
        Command::Info { pdf } => info(&Project::open(&pdf, session, config)?, config),
        Command::Init { pdf, force } => init(&pdf, session, force),
        Command::Add(args) => add(args, config, session),
        Command::Move {
            pdf,
            number,
            page,
            center,
            target,
            renumber_to,
        } => {
            let mut project = Project::open(&pdf, session, config)?;
            let uid = project.find(number, page)?;
            let current = project.sheet.get(uid)?.clone();
            let center = center.map(doc_point).unwrap_or(current.balloon_center);
            let target = target.map(doc_point).unwrap_or(current.target_point);
            project.sheet.move_balloon(uid, center, target)?;
            if let Some(n) = renumber_to {
                project.sheet.set_number(uid, n)?;
            }
            project.save()?;
            let moved = project.sheet.get(uid)?;
            Ok(format!(
                "Balloon #{} on page {} at ({:.1}, {:.1})",
                moved.number,
                moved.page + 1,
                moved.balloon_center.x,
                moved.balloon_center.y
            ))
        }
        Command::Remove { pdf, number, page } => {
            let mut project = Project::open(&pdf, session, config)?;
            let uid = project.find(number, page)?;
            project.sheet.delete(uid)?;
            project.save()?;
            Ok(format!("Removed balloon #{}", number))
        }
        Command::Describe {
            pdf,
            number,
            page,
            what,
        } => {
            let mut project = Project::open(&pdf, session, config)?;
            let uid = project.find(number, page)?;
            let text = description_text(what)?;
            project.sheet.set_description(uid, text.clone())?;
            project.save()?;
            Ok(format!("#{}: {}", number, text))
        }
        Command::Renumber { pdf } => {
            let mut project = Project::open(&pdf, session, config)?;
            project.sheet.renumber()?;
            let changed = project.sheet.is_modified();
            project.save()?;
            Ok(if changed {
                format!("Renumbered {} balloons", project.sheet.len())
            } else {
                "Numbering already in order".to_string()
            })
        }
        Command::Rotate {
            pdf,
            page,
            direction,
        } => rotate(&pdf, page, &direction, config, session),
        Command::List { pdf, page, json } => {
            let project = Project::open(&pdf, session, config)?;
            list(&project, page, json)
        }
        Command::Export {
            pdf,
            format,
            output,
        } => {
            let project = Project::open(&pdf, session, config)?;
            export_to(&project, format, output, config)
        }
    }
}

fn doc_point(p: PointArg) -> DocPoint {
    DocPoint::new(p.x, p.y)
}

fn info(project: &Project, config: &Config) -> Result<String> {
    let scale = render_scale(config.view.base_dpi);
    let mut out = String::new();
    writeln!(out, "{}: {} page(s)", project.pdf.display(), project.pages.len())?;
    for (i, page) in project.pages.iter().enumerate() {
        let user = project
            .session
            .page_rotations
            .get(&(i as u32))
            .copied()
            .unwrap_or(0);
        let (w, h) = page.displayed_size(user);
        writeln!(
            out,
            "  page {}: {:.1} x {:.1} pt, rotate {} (+{} view), {:.0} x {:.0} px at {} dpi, {} balloon(s)",
            i + 1,
            page.width(),
            page.height(),
            page.rotation,
            user,
            w * scale,
            h * scale,
            config.view.base_dpi,
            project.sheet.on_page(i as u32).len()
        )?;
    }
    write!(out, "session: {}", project.session_path.display())?;
    Ok(out)
}

fn init(pdf: &Path, session_override: Option<&Path>, force: bool) -> Result<String> {
    let bytes = std::fs::read(pdf).with_context(|| format!("Failed to read PDF: {}", pdf.display()))?;
    inspect(&bytes).with_context(|| format!("Not a readable PDF: {}", pdf.display()))?;
    let path = session_override
        .map(Path::to_path_buf)
        .unwrap_or_else(|| sidecar_path(pdf));
    if path.exists() && !force {
        bail!(
            "Session already exists: {} (use --force to replace it)",
            path.display()
        );
    }
    Session::new(pdf).save(&path)?;
    Ok(format!("Created {}", path.display()))
}

fn add(args: AddArgs, config: &Config, session: Option<&Path>) -> Result<String> {
    let mut project = Project::open(&args.pdf, session, config)?;
    let page = project.page_index(args.page)?;

    let target = if args.from_view {
        view_target(&project, page, &args, config)?
    } else {
        doc_point(args.at)
    };

    let defaults = project.sheet.defaults_mut();
    if let Some(style) = args.style {
        defaults.style = style;
    }
    if let Some(diameter) = args.diameter {
        if diameter <= 0.0 {
            bail!("--diameter must be positive");
        }
        defaults.diameter = diameter;
    }
    if let Some(size) = args.font_size {
        defaults.font_size = size.max(0.0);
    }

    let uid = project.sheet.place(page, target)?;
    if let Some(center) = args.center {
        project.sheet.move_balloon(uid, doc_point(center), target)?;
    }
    if let Some(description) = args.description {
        project.sheet.set_description(uid, description)?;
    }
    project.save()?;

    let balloon = project.sheet.get(uid)?;
    Ok(format!(
        "Placed balloon #{} on page {} pointing at ({:.1}, {:.1})",
        balloon.number,
        balloon.page + 1,
        balloon.target_point.x,
        balloon.target_point.y
    ))
}

/// Replay a click in a viewer set up with the requested zoom, pan and rotation.
fn view_target(project: &Project, page: u32, args: &AddArgs, config: &Config) -> Result<DocPoint> {
    let mut viewer = config.view.viewer();
    viewer.load(project.pages.clone());
    let mut rotations = project.session.page_rotations.clone();
    if let Some(deg) = args.rotation {
        rotations.insert(page, normalize_rotation(deg)?);
    }
    viewer.set_user_rotations(rotations);
    viewer.set_page(page);
    viewer.viewport_mut().set_zoom(args.zoom);
    if let Some(pan) = args.pan {
        viewer.viewport_mut().set_pan(ScreenPoint::new(pan.x, pan.y));
    }
    viewer.set_mode(ViewMode::Balloon);

    let click = ScreenPoint::new(args.at.x, args.at.y);
    match viewer.press(PointerButton::Left, click, project.sheet.balloons().iter()) {
        Some(ViewerEvent::BalloonRequested { target, .. }) => {
            tracing::debug!(
                zoom = viewer.viewport().zoom(),
                rotation = viewer.displayed_rotation(),
                x = target.x,
                y = target.y,
                "mapped view click"
            );
            Ok(target)
        }
        _ => bail!("The viewer did not accept the click"),
    }
}

fn rotate(
    pdf: &Path,
    page: u32,
    direction: &str,
    config: &Config,
    session: Option<&Path>,
) -> Result<String> {
    let mut project = Project::open(pdf, session, config)?;
    let index = project.page_index(page)?;

    let mut viewer = config.view.viewer();
    viewer.load(project.pages.clone());
    viewer.set_user_rotations(project.session.page_rotations.clone());
    viewer.set_page(index);
    let rotation = match direction.trim().to_lowercase().as_str() {
        "cw" => viewer.rotate_cw(),
        "ccw" => viewer.rotate_ccw(),
        other => {
            let deg: i32 = other
                .parse()
                .with_context(|| format!("Expected cw, ccw or degrees, got '{}'", direction))?;
            let mut rotations = viewer.user_rotations().clone();
            rotations.insert(index, normalize_rotation(deg)?);
            viewer.set_user_rotations(rotations);
            viewer.user_rotation(index)
        }
    };
    project.session.page_rotations = viewer.user_rotations().clone();
    project.save()?;
    Ok(format!(
        "Page {} view rotation {}° (displayed at {}°)",
        page,
        rotation,
        viewer.displayed_rotation()
    ))
}

fn list(project: &Project, page: Option<u32>, json: bool) -> Result<String> {
    let page = page.map(|p| project.page_index(p)).transpose()?;
    let rows: Vec<table::TableRow> = table::rows(&project.sheet)
        .into_iter()
        .filter(|r| page.map_or(true, |p| r.page == p + 1))
        .collect();
    if json {
        return Ok(serde_json::to_string_pretty(&rows)?);
    }
    let mut out = table::HEADERS.join("\t");
    for row in &rows {
        out.push('\n');
        out.push_str(&row.cells().join("\t"));
    }
    Ok(out)
}

fn export_to(
    project: &Project,
    format: ExportFormat,
    output: Option<PathBuf>,
    config: &Config,
) -> Result<String> {
    let output = output.unwrap_or_else(|| format.default_path(&project.pdf, &config.export.suffix));
    let balloons: Vec<&Balloon> = project.sheet.sorted();
    match format {
        ExportFormat::Pdf => {
            let summary = export::export_pdf(
                &project.pdf,
                &output,
                balloons,
                &project.session.page_rotations,
                &config.export.overlay(),
            )?;
            Ok(format!(
                "Wrote {} ({} balloon(s) on {} page(s))",
                output.display(),
                summary.balloons_drawn,
                summary.pages_annotated
            ))
        }
        ExportFormat::Csv => {
            let rows = export::export_csv(&output, balloons)?;
            Ok(format!("Wrote {} ({} row(s))", output.display(), rows))
        }
        ExportFormat::Xlsx => {
            let today = chrono::Local::now().date_naive();
            export::export_xlsx(&output, balloons, &drawing_name(&project.pdf), today)?;
            Ok(format!("Wrote {}", output.display()))
        }
    }
}

fn description_text(what: Description) -> Result<String> {
    let text = match what {
        Description::Text { text } => text,
        Description::Frame {
            characteristic,
            tolerance,
            diameter,
            material,
            free_state,
            tangent_plane,
            projected,
            statistical,
            datums,
        } => {
            let mut frame = FeatureControlFrame::new(characteristic, tolerance)
                .zone(ZoneModifiers {
                    free_state,
                    tangent_plane,
                    projected,
                    statistical,
                })
                .datums(datums);
            if diameter {
                frame = frame.diameter();
            }
            if let Some(condition) = material {
                frame = frame.material(condition);
            }
            frame.to_string()
        }
        Description::Dimension {
            nominal,
            kind,
            upper,
            lower,
        } => {
            let dim = Dimension::new(kind, nominal);
            let upper = upper.unwrap_or_else(|| dim.upper.clone());
            let lower = lower.unwrap_or_else(|| dim.lower.clone());
            dim.tolerance(upper, lower).to_string()
        }
        Description::Surface {
            value,
            grade,
            param,
            process,
            unit,
            lay,
            method,
        } => {
            let finish = match (grade, value) {
                (Some(grade), _) => SurfaceFinish::from_grade(&grade)
                    .with_context(|| format!("Unknown roughness grade '{}'", grade))?,
                (None, Some(value)) => SurfaceFinish::new(param, value),
                (None, None) => bail!("Give a roughness value or --grade"),
            };
            let mut finish = finish.process(process).unit(unit);
            if let Some(lay) = lay {
                finish = finish.lay(lay);
            }
            if let Some(method) = method {
                finish = finish.method(method);
            }
            finish.to_string()
        }
    };
    Ok(text)
}
