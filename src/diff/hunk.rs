use nom::{
    IResult, Parser,
    bytes::complete::tag,
    character::complete::{char, digit1},
    combinator::{map_res, opt, rest},
    sequence::preceded,
};
use std::fmt;

/// A line range from a hunk header (`-start,count` or `+start,count`)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRange {
    pub start: u32,
    pub count: u32,
}

/// How a diff line relates the old and new versions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Context,
    Added,
    Removed,
}

impl LineKind {
    /// The leading marker character used in unified diffs
    pub fn marker(self) -> char {
        match self {
            LineKind::Context => ' ',
            LineKind::Added => '+',
            LineKind::Removed => '-',
        }
    }

    /// Classify a hunk body line by its leading marker
    pub fn from_marker(c: char) -> Option<Self> {
        match c {
            ' ' => Some(LineKind::Context),
            '+' => Some(LineKind::Added),
            '-' => Some(LineKind::Removed),
            _ => None,
        }
    }
}

/// A single line of a hunk body, marker stripped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
    /// Followed by `\ No newline at end of file`
    pub missing_newline: bool,
}

impl DiffLine {
    pub fn new(kind: LineKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            missing_newline: false,
        }
    }
}

/// A single hunk from a diff
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hunk {
    /// The header line exactly as it appeared in the input
    pub header: String,
    pub old: LineRange,
    pub new: LineRange,
    /// Section heading after the closing `@@`, if any
    pub heading: Option<String>,
    pub lines: Vec<DiffLine>,
    /// The input ended before the declared ranges were filled
    pub truncated: bool,
}

impl Hunk {
    /// Start an empty hunk from its header line.
    ///
    /// Returns `None` if the header is not a valid `@@ -a,b +c,d @@` line.
    pub fn from_header(header: &str) -> Option<Self> {
        let (_, (old, new, heading)) = parse_header(header).ok()?;
        let heading = heading.trim();

        Some(Hunk {
            header: header.to_string(),
            old,
            new,
            heading: (!heading.is_empty()).then(|| heading.to_string()),
            lines: Vec::new(),
            truncated: false,
        })
    }

    /// Number of lines counted against the old range so far
    pub fn old_seen(&self) -> u32 {
        self.count(|kind| kind != LineKind::Added)
    }

    /// Number of lines counted against the new range so far
    pub fn new_seen(&self) -> u32 {
        self.count(|kind| kind != LineKind::Removed)
    }

    /// Whether the declared old and new ranges are both filled
    pub fn is_complete(&self) -> bool {
        self.old_seen() >= self.old.count && self.new_seen() >= self.new.count
    }

    /// Whether another line of this kind still fits the declared ranges
    pub fn accepts(&self, kind: LineKind) -> bool {
        let old_room = self.old_seen() < self.old.count;
        let new_room = self.new_seen() < self.new.count;
        match kind {
            LineKind::Context => old_room && new_room,
            LineKind::Removed => old_room,
            LineKind::Added => new_room,
        }
    }

    fn count(&self, f: impl Fn(LineKind) -> bool) -> u32 {
        self.lines.iter().filter(|l| f(l.kind)).count() as u32
    }
}

/// `@@ -old[,n] +new[,n] @@[ heading]`
fn parse_header(input: &str) -> IResult<&str, (LineRange, LineRange, &str)> {
    let (input, (_, old, _, new, _, heading)) =
        (tag("@@ -"), range, tag(" +"), range, tag(" @@"), rest).parse(input)?;
    Ok((input, (old, new, heading)))
}

/// `start[,count]`; an omitted count means one line
fn range(input: &str) -> IResult<&str, LineRange> {
    let (input, start) = number(input)?;
    let (input, count) = opt(preceded(char(','), number)).parse(input)?;
    Ok((
        input,
        LineRange {
            start,
            count: count.unwrap_or(1),
        },
    ))
}

fn number(input: &str) -> IResult<&str, u32> {
    map_res(digit1, str::parse::<u32>).parse(input)
}

impl fmt::Display for Hunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.header)?;

        for line in &self.lines {
            writeln!(f, "{}{}", line.kind.marker(), line.text)?;
            if line.missing_newline {
                writeln!(f, "\\ No newline at end of file")?;
            }
        }

        Ok(())
    }
}
