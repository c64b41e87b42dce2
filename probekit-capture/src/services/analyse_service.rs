use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use probekit_analyser::{
    find_conflicts, parse_positions, read_hits, read_lines, AnalyseError, Coordinate, Hit, OccupancyGrid, TopicGroups,
    DEFAULT_LABEL,
};

use crate::configs::Analyser;

/// How coordinates are laid out in a capture log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum LogFormat {
    /// `<hit_marker> <seq> x,y <content_separator>...` lines among other traffic
    #[default]
    Hits,
    /// Every non-blank line is `x,y<line_separator>...`
    Lines,
}

/// A capture log to take coordinates from, and the mark its cells get on a grid.
#[derive(Debug, Clone)]
pub struct CoordinateLog {
    pub path: PathBuf,
    pub format: LogFormat,
    pub label: char,
}

impl CoordinateLog {
    pub fn new(path: impl Into<PathBuf>, format: LogFormat) -> Self {
        Self {
            path: path.into(),
            format,
            label: DEFAULT_LABEL,
        }
    }

    pub fn labelled(mut self, label: char) -> Self {
        self.label = label;
        self
    }

    fn read(&self, settings: &Analyser) -> Result<(Vec<Hit>, Vec<Coordinate>), AnalyseError> {
        let (hits, separator) = match self.format {
            LogFormat::Hits => (read_hits(&self.path, &settings.hit_marker)?, &settings.content_separator),
            LogFormat::Lines => (read_lines(&self.path)?, &settings.line_separator),
        };
        let positions = parse_positions(&hits, separator)?;
        tracing::info!("{} positions in {}", positions.len(), self.path.display());

        Ok((hits, positions))
    }
}

/// Noise-filtered key grouping of a raw capture log.
pub fn topic_groups(log: &Path, settings: &Analyser) -> Result<TopicGroups, AnalyseError> {
    let mut groups = TopicGroups::from_file(log, &settings.separator)?;
    let removed = groups.remove_noise(&settings.noise_marker);
    tracing::info!("{} keys kept, {} noise keys dropped", groups.len(), removed);

    Ok(groups)
}

fn format_positions<I: IntoIterator<Item = Coordinate>>(positions: I) -> String {
    let items = positions.into_iter().map(|p| p.to_string()).collect::<Vec<_>>();
    format!("[{}]", items.join(", "))
}

pub struct GridReport {
    pub hits: Vec<Hit>,
    pub positions: Vec<Coordinate>,
    pub grid: OccupancyGrid,
}

impl GridReport {
    pub fn build(log: &CoordinateLog, settings: &Analyser) -> Result<Self, AnalyseError> {
        let (hits, positions) = log.read(settings)?;
        let grid = OccupancyGrid::default().with_source(log.label, positions.iter().copied());

        Ok(Self { hits, positions, grid })
    }

    /// One hit per line, in log order.
    pub fn write_hits(&self, path: &Path) -> io::Result<()> {
        let body = self.hits.iter().map(|h| format!("{}\n", h.content)).collect::<String>();
        fs::write(path, body)
    }
}

impl fmt::Display for GridReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for hit in &self.hits {
            writeln!(f, "{}", hit.content)?;
        }
        writeln!(f, "{} hits found", self.hits.len())?;
        writeln!(f, "positions = {}", format_positions(self.positions.iter().copied()))?;
        write!(f, "{}", self.grid)
    }
}

pub struct SourcePositions {
    pub label: char,
    pub positions: Vec<Coordinate>,
}

/// Cross-check of two independently captured coordinate sets, drawn on one
/// grid. The right-hand source draws over the left on shared cells.
pub struct ConflictReport {
    pub left: SourcePositions,
    pub right: SourcePositions,
    pub conflicts: Vec<Coordinate>,
    pub grid: OccupancyGrid,
}

impl ConflictReport {
    pub fn build(left: &CoordinateLog, right: &CoordinateLog, settings: &Analyser) -> Result<Self, AnalyseError> {
        let (_, left_positions) = left.read(settings)?;
        let (_, right_positions) = right.read(settings)?;

        let conflicts = find_conflicts(&left_positions, &right_positions);
        for conflict in &conflicts {
            tracing::warn!("coordinate {} captured by both sources", conflict);
        }

        let grid = OccupancyGrid::default()
            .with_source(left.label, left_positions.iter().copied())
            .with_source(right.label, right_positions.iter().copied());

        Ok(Self {
            left: SourcePositions { label: left.label, positions: left_positions },
            right: SourcePositions { label: right.label, positions: right_positions },
            conflicts,
            grid,
        })
    }
}

impl fmt::Display for ConflictReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for source in [&self.left, &self.right] {
            writeln!(
                f,
                "{} = {} ({} positions)",
                source.label,
                format_positions(source.positions.iter().copied()),
                source.positions.len()
            )?;
        }
        writeln!(f, "{} conflicting coordinates", self.conflicts.len())?;
        writeln!(f, "conflicts = {}", format_positions(self.conflicts.iter().copied()))?;
        write!(f, "{}", self.grid)?;
        writeln!(f, "{} holes", self.grid.holes().count())?;
        writeln!(f, "holes = {}", format_positions(self.grid.holes()))
    }
}
