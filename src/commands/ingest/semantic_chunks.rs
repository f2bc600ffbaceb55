use anyhow::{Context, Result};
use regex::Regex;
use serde::Serialize;

use crate::model::BookProfile;

use super::ordinal::resolve_ordinal;
use super::paragraph_split::split_classical_paragraphs;
use super::structure_parse::{Chapter, DocumentStructure, Preface, Volume};

pub const DEFAULT_CHAPTER_SPLIT_THRESHOLD: usize = 1500;
pub const DEFAULT_MIN_PARAGRAPH_CHARS: usize = 50;

const UNKNOWN_CHAPTER_INDEX: &str = "未知";

#[derive(Debug, Clone, Copy)]
pub struct ChunkLimits {
    /// Chapters at or under this char count stay whole; larger ones are
    /// re-segmented into paragraph groups.
    pub chapter_split_threshold: usize,
    /// Paragraph groups at or under this trimmed char count are discarded
    /// rather than emitted.
    pub min_paragraph_chars: usize,
}

impl Default for ChunkLimits {
    fn default() -> Self {
        Self {
            chapter_split_threshold: DEFAULT_CHAPTER_SPLIT_THRESHOLD,
            min_paragraph_chars: DEFAULT_MIN_PARAGRAPH_CHARS,
        }
    }
}

/// Terminal output record: trimmed non-empty text plus structural provenance.
/// Chunks carry no back-reference into the structure tree.
#[derive(Debug, Clone, Serialize)]
pub struct Chunk {
    pub content: String,
    pub kind: ChunkKind,
}

/// One variant per chunk shape, each carrying only the fields that vary for
/// it. The fixed values of the metadata vocabulary (content types, the "0"
/// indices of front matter) are realized by the accessors below.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "block_type", rename_all = "snake_case")]
pub enum ChunkKind {
    Preface {
        chapter_title: String,
        language_style: String,
        era: String,
    },
    TableOfContents,
    VolumeTitle {
        volume_title: String,
        volume_index: String,
    },
    Chapter {
        volume_title: String,
        volume_index: String,
        chapter_title: String,
        chapter_index: String,
        language_style: String,
        era: String,
    },
    ChapterParagraph {
        volume_title: String,
        volume_index: String,
        chapter_title: String,
        chapter_index: String,
        paragraph_index: i64,
        language_style: String,
        era: String,
    },
}

impl ChunkKind {
    pub fn block_type(&self) -> &'static str {
        match self {
            ChunkKind::Preface { .. } => "preface",
            ChunkKind::TableOfContents => "table_of_contents",
            ChunkKind::VolumeTitle { .. } => "volume_title",
            ChunkKind::Chapter { .. } => "chapter",
            ChunkKind::ChapterParagraph { .. } => "chapter_paragraph",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ChunkKind::Preface { .. } => "序言",
            ChunkKind::TableOfContents => "目录",
            ChunkKind::VolumeTitle { .. } => "卷标题",
            ChunkKind::Chapter { .. } => "章节",
            ChunkKind::ChapterParagraph { .. } => "章节段落",
        }
    }

    pub fn volume_title(&self) -> &str {
        match self {
            ChunkKind::Preface { .. } => "序言",
            ChunkKind::TableOfContents => "全书目录",
            ChunkKind::VolumeTitle { volume_title, .. }
            | ChunkKind::Chapter { volume_title, .. }
            | ChunkKind::ChapterParagraph { volume_title, .. } => volume_title,
        }
    }

    pub fn volume_index(&self) -> &str {
        match self {
            ChunkKind::Preface { .. } | ChunkKind::TableOfContents => "0",
            ChunkKind::VolumeTitle { volume_index, .. }
            | ChunkKind::Chapter { volume_index, .. }
            | ChunkKind::ChapterParagraph { volume_index, .. } => volume_index,
        }
    }

    pub fn chapter_title(&self) -> &str {
        match self {
            ChunkKind::Preface { chapter_title, .. } => chapter_title,
            ChunkKind::TableOfContents => "目录",
            ChunkKind::VolumeTitle { .. } => "卷标题",
            ChunkKind::Chapter { chapter_title, .. }
            | ChunkKind::ChapterParagraph { chapter_title, .. } => chapter_title,
        }
    }

    pub fn chapter_index(&self) -> &str {
        match self {
            ChunkKind::Preface { .. }
            | ChunkKind::TableOfContents
            | ChunkKind::VolumeTitle { .. } => "0",
            ChunkKind::Chapter { chapter_index, .. }
            | ChunkKind::ChapterParagraph { chapter_index, .. } => chapter_index,
        }
    }

    pub fn paragraph_index(&self) -> Option<i64> {
        match self {
            ChunkKind::ChapterParagraph {
                paragraph_index, ..
            } => Some(*paragraph_index),
            _ => None,
        }
    }

    pub fn language_style(&self) -> Option<&str> {
        match self {
            ChunkKind::Preface { language_style, .. }
            | ChunkKind::Chapter { language_style, .. }
            | ChunkKind::ChapterParagraph { language_style, .. } => Some(language_style),
            ChunkKind::TableOfContents | ChunkKind::VolumeTitle { .. } => None,
        }
    }

    pub fn era(&self) -> Option<&str> {
        match self {
            ChunkKind::Preface { era, .. }
            | ChunkKind::Chapter { era, .. }
            | ChunkKind::ChapterParagraph { era, .. } => Some(era),
            ChunkKind::TableOfContents | ChunkKind::VolumeTitle { .. } => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ChunkOutput {
    pub chunks: Vec<Chunk>,
    pub short_paragraphs_filtered: usize,
}

/// Walks a parsed structure and emits the ordered chunk stream: preface,
/// table of contents (re-scanned from the raw text), then per volume its
/// title chunk and its chapters, whole or paragraph-split by size.
#[derive(Debug)]
pub struct SemanticChunker {
    profile: BookProfile,
    limits: ChunkLimits,
    toc_heading: Regex,
    volume_heading: Regex,
    toc_leader: Regex,
    numeric_line: Regex,
    ordinal_prefix: Regex,
    paren_ordinal_prefix: Regex,
    decimal_prefix: Regex,
}

impl SemanticChunker {
    pub fn new(profile: BookProfile, limits: ChunkLimits) -> Result<Self> {
        Ok(Self {
            profile,
            limits,
            toc_heading: Regex::new(r"^目\s*录").context("failed to compile toc heading regex")?,
            volume_heading: Regex::new(r"^【卷之[一二三四五六七八九十]+】")
                .context("failed to compile volume heading regex")?,
            toc_leader: Regex::new(r"\.{3,}\s*\d+")
                .context("failed to compile toc leader regex")?,
            numeric_line: Regex::new(r"^\d+$").context("failed to compile numeric line regex")?,
            ordinal_prefix: Regex::new(r"^([一二三四五六七八九十])、")
                .context("failed to compile ordinal prefix regex")?,
            paren_ordinal_prefix: Regex::new(r"^（([一二三四五六七八九十])）")
                .context("failed to compile parenthesized ordinal regex")?,
            decimal_prefix: Regex::new(r"^([0-9]+)\.")
                .context("failed to compile decimal prefix regex")?,
        })
    }

    pub fn chunk(&self, structure: &DocumentStructure, full_text: &str) -> ChunkOutput {
        let mut output = ChunkOutput::default();

        if let Some(preface) = &structure.preface {
            output.chunks.push(self.preface_chunk(preface));
        }

        if structure.has_toc {
            if let Some(chunk) = self.toc_chunk(full_text) {
                output.chunks.push(chunk);
            }
        }

        for volume in &structure.volumes {
            output.chunks.push(self.volume_title_chunk(volume));
            for chapter in &volume.chapters {
                self.push_chapter_chunks(volume, chapter, &mut output);
            }
        }

        output
    }

    fn preface_chunk(&self, preface: &Preface) -> Chunk {
        Chunk {
            content: format!("{}\n\n{}", preface.title, preface.content),
            kind: ChunkKind::Preface {
                chapter_title: preface.title.clone(),
                language_style: self.profile.language_style.clone(),
                era: self.profile.era.clone(),
            },
        }
    }

    /// Re-scans the raw text between the TOC heading and the first volume
    /// heading. Dotted leaders with trailing page numbers are stripped, and
    /// lines that are purely numeric or collapse to a single char go away.
    fn toc_chunk(&self, full_text: &str) -> Option<Chunk> {
        let mut toc_lines = Vec::new();
        let mut in_toc = false;

        for raw in full_text.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if self.toc_heading.is_match(line) {
                in_toc = true;
                continue;
            }
            if in_toc && self.volume_heading.is_match(line) {
                break;
            }
            if !in_toc {
                continue;
            }

            let cleaned = self.toc_leader.replace_all(line, "");
            let cleaned = cleaned.trim();
            if cleaned.chars().count() > 1 && !self.numeric_line.is_match(cleaned) {
                toc_lines.push(cleaned.to_string());
            }
        }

        if toc_lines.is_empty() {
            return None;
        }

        Some(Chunk {
            content: format!("《{}》目录\n\n{}", self.profile.title, toc_lines.join("\n")),
            kind: ChunkKind::TableOfContents,
        })
    }

    fn volume_title_chunk(&self, volume: &Volume) -> Chunk {
        Chunk {
            content: volume.title.clone(),
            kind: ChunkKind::VolumeTitle {
                volume_title: volume.title.clone(),
                volume_index: volume.index.clone(),
            },
        }
    }

    fn push_chapter_chunks(&self, volume: &Volume, chapter: &Chapter, output: &mut ChunkOutput) {
        let chapter_content = build_chapter_content(chapter);
        let chapter_index = self.extract_chapter_index(&chapter.title);

        if chapter_content.chars().count() <= self.limits.chapter_split_threshold {
            output.chunks.push(Chunk {
                content: chapter_content,
                kind: ChunkKind::Chapter {
                    volume_title: volume.title.clone(),
                    volume_index: volume.index.clone(),
                    chapter_title: chapter.title.clone(),
                    chapter_index,
                    language_style: self.profile.language_style.clone(),
                    era: self.profile.era.clone(),
                },
            });
            return;
        }

        // The paragraph index counts positions among all merged groups, so
        // indices stay stable when a short group is filtered away.
        for (position, paragraph) in split_classical_paragraphs(&chapter_content)
            .iter()
            .enumerate()
        {
            let trimmed = paragraph.trim();
            if trimmed.chars().count() <= self.limits.min_paragraph_chars {
                output.short_paragraphs_filtered += 1;
                continue;
            }

            output.chunks.push(Chunk {
                content: trimmed.to_string(),
                kind: ChunkKind::ChapterParagraph {
                    volume_title: volume.title.clone(),
                    volume_index: volume.index.clone(),
                    chapter_title: chapter.title.clone(),
                    chapter_index: chapter_index.clone(),
                    paragraph_index: (position + 1) as i64,
                    language_style: self.profile.language_style.clone(),
                    era: self.profile.era.clone(),
                },
            });
        }
    }

    /// Pulls a chapter number out of the heading: an enumerated "一、" prefix
    /// (resolved to decimal), a parenthesized ordinal, or a leading decimal
    /// with a period. Headings with none of these get the unknown marker.
    fn extract_chapter_index(&self, title: &str) -> String {
        if let Some(ordinal) = self
            .ordinal_prefix
            .captures(title)
            .and_then(|captures| captures.get(1))
        {
            return resolve_ordinal(ordinal.as_str());
        }

        if let Some(ordinal) = self
            .paren_ordinal_prefix
            .captures(title)
            .and_then(|captures| captures.get(1))
        {
            return ordinal.as_str().to_string();
        }

        if let Some(number) = self
            .decimal_prefix
            .captures(title)
            .and_then(|captures| captures.get(1))
        {
            return number.as_str().to_string();
        }

        UNKNOWN_CHAPTER_INDEX.to_string()
    }
}

/// Chapter text as chunked: heading, blank line, body, and the annotations
/// newline-joined after another blank line when present.
pub fn build_chapter_content(chapter: &Chapter) -> String {
    let mut content = format!("{}\n\n{}", chapter.title, chapter.content);
    if !chapter.annotations.is_empty() {
        content.push_str("\n\n");
        content.push_str(&chapter.annotations.join("\n"));
    }

    content.trim().to_string()
}
