use anyhow::{Context, Result};
use regex::Regex;

use super::ordinal::resolve_ordinal;

/// Structural model of one work, built in a single forward pass over the
/// cleaned line stream and immutable afterwards.
#[derive(Debug, Default)]
pub struct DocumentStructure {
    pub has_toc: bool,
    pub preface: Option<Preface>,
    pub volumes: Vec<Volume>,
}

#[derive(Debug)]
pub struct Preface {
    pub title: String,
    pub content: String,
}

#[derive(Debug)]
pub struct Volume {
    /// The heading line verbatim.
    pub title: String,
    /// Resolved ordinal, or the raw token when it falls outside 一–十.
    pub index: String,
    pub chapters: Vec<Chapter>,
}

#[derive(Debug)]
pub struct Chapter {
    pub title: String,
    pub content: String,
    pub annotations: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParseMode {
    Preface,
    PrefaceContent,
    Toc,
    Structural,
}

pub const DEFAULT_ANNOTATION_TAGS: [&str; 3] = ["乾按", "注", "居士按"];

const CHAPTER_HEADING_PATTERNS: [&str; 3] = [
    r"^[一二三四五六七八九十]、[^.]+章",
    r"^[^.]+章",
    r"^[①②③④⑤⑥⑦⑧⑨⑩]、[^.]+",
];

/// Line-classification state machine recovering preface, table of contents,
/// volumes, chapters and inline annotations from flat page text. Every line
/// is handled; malformed input degrades to drop-or-attach, never an error.
#[derive(Debug)]
pub struct StructureParser {
    preface_title: String,
    toc_heading: Regex,
    volume_heading: Regex,
    chapter_headings: Vec<Regex>,
    annotation_tags: Vec<Regex>,
}

impl StructureParser {
    pub fn new(preface_title: &str, annotation_tags: &[String]) -> Result<Self> {
        let mut chapter_headings = Vec::with_capacity(CHAPTER_HEADING_PATTERNS.len());
        for pattern in CHAPTER_HEADING_PATTERNS {
            chapter_headings.push(
                Regex::new(pattern)
                    .with_context(|| format!("failed to compile chapter heading regex {pattern}"))?,
            );
        }

        let tags: Vec<String> = if annotation_tags.is_empty() {
            DEFAULT_ANNOTATION_TAGS
                .iter()
                .map(|tag| tag.to_string())
                .collect()
        } else {
            annotation_tags.to_vec()
        };

        let mut annotation_regexes = Vec::with_capacity(tags.len());
        for tag in &tags {
            let pattern = format!(r"^\[{}\]", regex::escape(tag));
            annotation_regexes.push(
                Regex::new(&pattern)
                    .with_context(|| format!("failed to compile annotation regex for tag {tag}"))?,
            );
        }

        Ok(Self {
            preface_title: preface_title.to_string(),
            toc_heading: Regex::new(r"^目\s*录").context("failed to compile toc heading regex")?,
            volume_heading: Regex::new(r"^【卷之([一二三四五六七八九十]+)】")
                .context("failed to compile volume heading regex")?,
            chapter_headings,
            annotation_tags: annotation_regexes,
        })
    }

    pub fn parse(&self, lines: &[String]) -> DocumentStructure {
        let mut structure = DocumentStructure::default();
        let mut mode = ParseMode::Preface;
        // Cursors are indices into the owned vectors; a structural transition
        // replaces them rather than mutating through aliased references.
        let mut current_volume: Option<usize> = None;
        let mut current_chapter: Option<usize> = None;

        for raw in lines {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if self.toc_heading.is_match(line) {
                structure.has_toc = true;
                mode = ParseMode::Toc;
                continue;
            }

            // A volume heading outranks every other class in every mode. It
            // also closes preface accumulation: the heading opens the volume
            // instead of being swallowed as preface text.
            if let Some(ordinal) = self.volume_ordinal(line) {
                structure.volumes.push(Volume {
                    title: line.to_string(),
                    index: resolve_ordinal(ordinal),
                    chapters: Vec::new(),
                });
                current_volume = Some(structure.volumes.len() - 1);
                current_chapter = None;
                mode = ParseMode::Structural;
                continue;
            }

            match mode {
                ParseMode::PrefaceContent => {
                    if let Some(preface) = structure.preface.as_mut() {
                        preface.content.push('\n');
                        preface.content.push_str(line);
                    }
                    continue;
                }
                ParseMode::Preface => {
                    if line.contains(&self.preface_title) {
                        structure.preface = Some(Preface {
                            title: self.preface_title.clone(),
                            content: line.to_string(),
                        });
                        mode = ParseMode::PrefaceContent;
                        continue;
                    }
                }
                ParseMode::Toc | ParseMode::Structural => {}
            }

            if self.is_chapter_heading(line) {
                // Chapter headings are only effective inside an open volume;
                // stray ones (front matter, unclosed TOC regions) are dropped.
                if let Some(volume_index) = current_volume {
                    let volume = &mut structure.volumes[volume_index];
                    volume.chapters.push(Chapter {
                        title: line.to_string(),
                        content: String::new(),
                        annotations: Vec::new(),
                    });
                    current_chapter = Some(volume.chapters.len() - 1);
                }
                continue;
            }

            let (Some(volume_index), Some(chapter_index)) = (current_volume, current_chapter)
            else {
                continue;
            };

            let chapter = &mut structure.volumes[volume_index].chapters[chapter_index];
            if self.is_annotation(line) {
                chapter.annotations.push(line.to_string());
            } else {
                if !chapter.content.is_empty() {
                    chapter.content.push('\n');
                }
                chapter.content.push_str(line);
            }
        }

        structure
    }

    fn volume_ordinal<'a>(&self, line: &'a str) -> Option<&'a str> {
        self.volume_heading
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|ordinal| ordinal.as_str())
    }

    fn is_chapter_heading(&self, line: &str) -> bool {
        self.chapter_headings
            .iter()
            .any(|pattern| pattern.is_match(line))
    }

    fn is_annotation(&self, line: &str) -> bool {
        self.annotation_tags
            .iter()
            .any(|pattern| pattern.is_match(line))
    }
}
