use std::path::PathBuf;

use super::chunk_insert::{chunk_id_for, chunk_records_for};
use super::ordinal::resolve_ordinal;
use super::page_clean::PageTextCleaner;
use super::page_source::doc_id_for;
use super::paragraph_split::{
    merge_short_units, segment_semantic_units, split_classical_paragraphs,
};
use super::run::{book_profile, render_ingest_command};
use super::semantic_chunks::{
    Chunk, ChunkKind, ChunkLimits, SemanticChunker, build_chapter_content,
};
use super::structure_parse::{Chapter, DocumentStructure, Preface, StructureParser, Volume};
use crate::cli::IngestArgs;
use crate::model::{BookProfile, PageDocEntry};

fn test_profile() -> BookProfile {
    BookProfile {
        title: "增删卜易".to_string(),
        preface_title: "增删卜易序".to_string(),
        language_style: "文言文".to_string(),
        era: "清代".to_string(),
    }
}

fn test_parser() -> StructureParser {
    StructureParser::new("增删卜易序", &[]).expect("parser patterns compile")
}

fn test_chunker() -> SemanticChunker {
    SemanticChunker::new(test_profile(), ChunkLimits::default()).expect("chunker patterns compile")
}

fn owned_lines(input: &[&str]) -> Vec<String> {
    input.iter().map(|line| line.to_string()).collect()
}

fn default_ingest_args() -> IngestArgs {
    IngestArgs {
        cache_root: PathBuf::from(".cache/guji"),
        inventory_manifest_path: None,
        ingest_manifest_path: None,
        chunk_manifest_path: None,
        db_path: None,
        refresh_inventory: false,
        emit_chunk_manifest: false,
        target_docs: Vec::new(),
        book_title: "增删卜易".to_string(),
        preface_title: None,
        language_style: "文言文".to_string(),
        era: "清代".to_string(),
        annotation_tags: Vec::new(),
        chapter_split_threshold: 1500,
        min_paragraph_chars: 50,
    }
}

#[test]
fn resolve_ordinal_maps_cardinals_and_passes_through_unknowns() {
    assert_eq!(resolve_ordinal("一"), "1");
    assert_eq!(resolve_ordinal("五"), "5");
    assert_eq!(resolve_ordinal("十"), "10");
    assert_eq!(resolve_ordinal("壹"), "壹");
    assert_eq!(resolve_ordinal("十一"), "十一");
    assert_eq!(resolve_ordinal(""), "");
}

#[test]
fn cleaner_drops_page_number_artifacts_and_collapses_whitespace() {
    let cleaner = PageTextCleaner::new().unwrap();
    let cleaned = cleaner.clean("  目  录  \n12\n1234\n\n天行健", 1);

    assert_eq!(cleaned.lines, vec!["目 录", "1234", "天行健"]);
    assert_eq!(cleaned.page_number_lines_dropped, 1);
}

#[test]
fn cleaner_is_idempotent_on_cleaned_output() {
    let cleaner = PageTextCleaner::new().unwrap();
    let first = cleaner.clean("  卷之一   天时 \n 3 \n正文内容。", 2);
    let second = cleaner.clean(&first.lines.join("\n"), 2);

    assert_eq!(first.lines, second.lines);
    assert_eq!(second.page_number_lines_dropped, 0);
}

#[test]
fn parser_builds_one_volume_per_heading_in_source_order() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&["【卷之一】", "【卷之二】", "【卷之三】"]));

    assert_eq!(structure.volumes.len(), 3);
    assert_eq!(structure.volumes[0].title, "【卷之一】");
    assert_eq!(structure.volumes[0].index, "1");
    assert_eq!(structure.volumes[1].index, "2");
    assert_eq!(structure.volumes[2].index, "3");
}

#[test]
fn parser_passes_unresolved_volume_ordinals_through() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&["【卷之十一】"]));

    assert_eq!(structure.volumes.len(), 1);
    assert_eq!(structure.volumes[0].index, "十一");
}

#[test]
fn parser_ignores_chapter_headings_before_any_volume() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&[
        "一、天时章",
        "【卷之一】",
        "一、天时章",
        "晴雨风云，各有所主。",
    ]));

    assert_eq!(structure.volumes.len(), 1);
    assert_eq!(structure.volumes[0].chapters.len(), 1);
    assert_eq!(structure.volumes[0].chapters[0].content, "晴雨风云，各有所主。");
}

#[test]
fn parser_accumulates_preface_and_closes_on_volume_heading() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&[
        "增删卜易序",
        "野鹤老人所著，以卜筮言。",
        "李我平鉴定。",
        "【卷之一】",
        "一、天时章",
        "正文第一句。",
    ]));

    let preface = structure.preface.as_ref().expect("preface recognized");
    assert_eq!(preface.title, "增删卜易序");
    assert_eq!(
        preface.content,
        "增删卜易序\n野鹤老人所著，以卜筮言。\n李我平鉴定。"
    );
    // The volume heading closes the preface and still opens the volume.
    assert!(!preface.content.contains("【卷之一】"));
    assert_eq!(structure.volumes.len(), 1);
    assert_eq!(structure.volumes[0].chapters.len(), 1);
}

#[test]
fn parser_routes_annotation_lines_to_the_open_chapter() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&[
        "【卷之一】",
        "一、天时章",
        "晴雨风云，各有所主。",
        "[乾按]此说与古法不同。",
        "[注]用神既定，祸福自明。",
        "后文继续。",
    ]));

    let chapter = &structure.volumes[0].chapters[0];
    assert_eq!(
        chapter.annotations,
        vec!["[乾按]此说与古法不同。", "[注]用神既定，祸福自明。"]
    );
    assert_eq!(chapter.content, "晴雨风云，各有所主。\n后文继续。");
}

#[test]
fn parser_marks_toc_and_drops_unclaimed_toc_lines() {
    let parser = test_parser();
    let structure = parser.parse(&owned_lines(&[
        "目录",
        "一、天时章....3",
        "二、人事章....9",
        "【卷之一】",
    ]));

    assert!(structure.has_toc);
    assert!(structure.preface.is_none());
    assert_eq!(structure.volumes.len(), 1);
    assert!(structure.volumes[0].chapters.is_empty());
}

#[test]
fn segment_semantic_units_waits_for_a_qualified_buffer() {
    // 20 chars at the first terminal mark, so the cut lands exactly there.
    let text = "一二三四五六七八九十，一二三四五六七八。其后又有文字未了";
    let units = segment_semantic_units(text);

    assert_eq!(units.len(), 2);
    assert_eq!(units[0], "一二三四五六七八九十，一二三四五六七八。");
    assert_eq!(units[1], "其后又有文字未了");
}

#[test]
fn segment_semantic_units_does_not_cut_without_terminal_marks() {
    let text = "甲乙丙丁戊己庚辛壬癸甲乙丙丁戊己庚辛壬癸\n后续";
    let units = segment_semantic_units(text);

    assert_eq!(units.len(), 1);
}

#[test]
fn segment_semantic_units_emits_trailing_fragment() {
    assert_eq!(segment_semantic_units("短"), vec!["短"]);
}

#[test]
fn split_classical_paragraphs_of_empty_input_is_empty() {
    assert!(split_classical_paragraphs("").is_empty());
}

#[test]
fn merge_short_units_flushes_at_limit_without_dropping() {
    let first = "天".repeat(300);
    let second = "地".repeat(400);
    let third = "人".repeat(300);
    let merged = merge_short_units(vec![first.clone(), second.clone(), third.clone()]);

    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0], format!("{first}\n{second}"));
    assert_eq!(merged[1], third);

    // The flush bound: a group never exceeds the limit by more than the
    // unit that closed it, and no unit is lost.
    let total: usize = merged.iter().map(|group| group.chars().count()).sum();
    assert_eq!(total, 300 + 1 + 400 + 300);
    assert!(merged[0].chars().count() < 800 + 400);
}

#[test]
fn chunker_emits_single_preface_chunk_with_front_matter_metadata() {
    let chunker = test_chunker();
    let mut structure = DocumentStructure::default();
    structure.preface = Some(Preface {
        title: "增删卜易序".to_string(),
        content: "增删卜易序\n野鹤老人所著。".to_string(),
    });

    let output = chunker.chunk(&structure, "");
    assert_eq!(output.chunks.len(), 1);

    let chunk = &output.chunks[0];
    assert!(chunk.content.starts_with("增删卜易序\n\n"));
    assert_eq!(chunk.kind.content_type(), "序言");
    assert_eq!(chunk.kind.block_type(), "preface");
    assert_eq!(chunk.kind.volume_title(), "序言");
    assert_eq!(chunk.kind.volume_index(), "0");
    assert_eq!(chunk.kind.chapter_index(), "0");
    assert_eq!(chunk.kind.language_style(), Some("文言文"));
    assert_eq!(chunk.kind.era(), Some("清代"));
}

#[test]
fn chunker_toc_chunk_strips_leaders_and_stops_at_first_volume() {
    let chunker = test_chunker();
    let mut structure = DocumentStructure::default();
    structure.has_toc = true;

    let full_text = "目录\n第一章....3\n12\n【卷之一】\n第二章....4\n";
    let output = chunker.chunk(&structure, full_text);

    assert_eq!(output.chunks.len(), 1);
    let chunk = &output.chunks[0];
    assert_eq!(chunk.kind.content_type(), "目录");
    assert_eq!(chunk.kind.volume_title(), "全书目录");
    assert!(chunk.content.starts_with("《增删卜易》目录\n\n"));
    assert!(chunk.content.contains("第一章"));
    assert!(!chunk.content.contains("....3"));
    assert!(!chunk.content.contains("12"));
    assert!(!chunk.content.contains("第二章"));
    assert!(!chunk.content.contains("【卷之一】"));
}

#[test]
fn chunker_toc_chunk_absent_when_nothing_survives_filtering() {
    let chunker = test_chunker();
    let mut structure = DocumentStructure::default();
    structure.has_toc = true;

    let output = chunker.chunk(&structure, "目录\n3\n7\n【卷之一】\n");
    assert!(output.chunks.is_empty());
}

#[test]
fn chunker_keeps_small_chapter_whole() {
    let chunker = test_chunker();
    let structure = DocumentStructure {
        has_toc: false,
        preface: None,
        volumes: vec![Volume {
            title: "【卷之一】".to_string(),
            index: "1".to_string(),
            chapters: vec![Chapter {
                title: "一、天时章".to_string(),
                content: "晴雨风云，各有所主。".to_string(),
                annotations: Vec::new(),
            }],
        }],
    };

    let output = chunker.chunk(&structure, "");
    assert_eq!(output.chunks.len(), 2);

    let volume_chunk = &output.chunks[0];
    assert_eq!(volume_chunk.kind.content_type(), "卷标题");
    assert_eq!(volume_chunk.content, "【卷之一】");
    assert_eq!(volume_chunk.kind.volume_index(), "1");
    assert_eq!(volume_chunk.kind.chapter_index(), "0");

    let chapter_chunk = &output.chunks[1];
    assert_eq!(chapter_chunk.kind.content_type(), "章节");
    assert_eq!(chapter_chunk.kind.chapter_index(), "1");
    assert_eq!(
        chapter_chunk.content,
        "一、天时章\n\n晴雨风云，各有所主。"
    );
    assert!(chapter_chunk.kind.paragraph_index().is_none());
}

#[test]
fn chunker_splits_oversized_chapter_into_indexed_paragraphs() {
    let chunker = test_chunker();
    let body = "天行健，君子以自强不息。".repeat(200);
    let structure = DocumentStructure {
        has_toc: false,
        preface: None,
        volumes: vec![Volume {
            title: "【卷之一】".to_string(),
            index: "1".to_string(),
            chapters: vec![Chapter {
                title: "一、乾坎艮震章".to_string(),
                content: body,
                annotations: Vec::new(),
            }],
        }],
    };

    let output = chunker.chunk(&structure, "");
    let paragraph_chunks: Vec<&Chunk> = output
        .chunks
        .iter()
        .filter(|chunk| matches!(chunk.kind, ChunkKind::ChapterParagraph { .. }))
        .collect();

    assert_eq!(output.chunks[0].kind.content_type(), "卷标题");
    assert!(paragraph_chunks.len() >= 2);

    for (position, chunk) in paragraph_chunks.iter().enumerate() {
        assert_eq!(chunk.kind.content_type(), "章节段落");
        assert_eq!(chunk.kind.paragraph_index(), Some((position + 1) as i64));
        assert!(chunk.content.trim().chars().count() > 50);
        assert_eq!(chunk.kind.chapter_index(), "1");
    }
}

#[test]
fn chunker_filters_short_paragraph_groups_but_keeps_indices_stable() {
    let chunker = test_chunker();
    // One oversized sentence forms its own group; the stray tail merges into
    // a group short enough to be filtered.
    let body = format!("{}。\n完", "天".repeat(1600));
    let structure = DocumentStructure {
        has_toc: false,
        preface: None,
        volumes: vec![Volume {
            title: "【卷之二】".to_string(),
            index: "2".to_string(),
            chapters: vec![Chapter {
                title: "二、卦变章".to_string(),
                content: body,
                annotations: Vec::new(),
            }],
        }],
    };

    let output = chunker.chunk(&structure, "");
    let paragraph_chunks: Vec<&Chunk> = output
        .chunks
        .iter()
        .filter(|chunk| matches!(chunk.kind, ChunkKind::ChapterParagraph { .. }))
        .collect();

    assert_eq!(paragraph_chunks.len(), 1);
    assert_eq!(paragraph_chunks[0].kind.paragraph_index(), Some(1));
    assert_eq!(output.short_paragraphs_filtered, 1);
}

#[test]
fn chunker_extracts_chapter_index_fallbacks() {
    let chunker = test_chunker();
    let chapters = [
        ("（三）卜筮格言", "三"),
        ("12.占卜条目", "12"),
        ("天时总论", "未知"),
    ];

    for (title, expected) in chapters {
        let structure = DocumentStructure {
            has_toc: false,
            preface: None,
            volumes: vec![Volume {
                title: "【卷之一】".to_string(),
                index: "1".to_string(),
                chapters: vec![Chapter {
                    title: title.to_string(),
                    content: "内容短小。".to_string(),
                    annotations: Vec::new(),
                }],
            }],
        };

        let output = chunker.chunk(&structure, "");
        assert_eq!(output.chunks[1].kind.chapter_index(), expected, "{title}");
    }
}

#[test]
fn chunker_yields_nothing_for_an_empty_structure() {
    let chunker = test_chunker();
    let output = chunker.chunk(&DocumentStructure::default(), "");

    assert!(output.chunks.is_empty());
    assert_eq!(output.short_paragraphs_filtered, 0);
}

#[test]
fn build_chapter_content_appends_annotations_after_blank_line() {
    let chapter = Chapter {
        title: "一、天时章".to_string(),
        content: "晴雨风云，各有所主。".to_string(),
        annotations: vec!["[乾按]旧注有误。".to_string(), "[注]宜参后章。".to_string()],
    };

    assert_eq!(
        build_chapter_content(&chapter),
        "一、天时章\n\n晴雨风云，各有所主。\n\n[乾按]旧注有误。\n[注]宜参后章。"
    );
}

#[test]
fn doc_id_for_sanitizes_filenames_and_keeps_cjk() {
    let entry = |filename: &str| PageDocEntry {
        filename: filename.to_string(),
        title: String::new(),
        page_count: 0,
        sha256: String::new(),
    };

    assert_eq!(doc_id_for(&entry("Zeng Shan_BuYi.pages.json")), "zeng-shan-buyi");
    assert_eq!(doc_id_for(&entry("增删卜易.pages.json")), "增删卜易");
    assert_eq!(doc_id_for(&entry("___.pages.json")), "doc");
}

#[test]
fn chunk_ids_are_sequenced_per_document() {
    assert_eq!(chunk_id_for("zengshanbuyi", "chapter", 7), "zengshanbuyi:chapter:0007");
}

#[test]
fn chunk_records_carry_the_full_metadata_vocabulary() {
    let chunks = vec![Chunk {
        content: "段落正文。".to_string(),
        kind: ChunkKind::ChapterParagraph {
            volume_title: "【卷之一】".to_string(),
            volume_index: "1".to_string(),
            chapter_title: "一、天时章".to_string(),
            chapter_index: "1".to_string(),
            paragraph_index: 2,
            language_style: "文言文".to_string(),
            era: "清代".to_string(),
        },
    }];

    let records = chunk_records_for("zengshanbuyi", &chunks);
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.chunk_id, "zengshanbuyi:chapter_paragraph:0001");
    assert_eq!(record.content_type, "章节段落");
    assert_eq!(record.block_type, "chapter_paragraph");
    assert_eq!(record.volume_index, "1");
    assert_eq!(record.chapter_index, "1");
    assert_eq!(record.paragraph_index, Some(2));
    assert_eq!(record.language_style.as_deref(), Some("文言文"));
    assert_eq!(record.era.as_deref(), Some("清代"));
}

#[test]
fn book_profile_derives_preface_title_from_book_title() {
    let args = default_ingest_args();
    let profile = book_profile(&args);

    assert_eq!(profile.preface_title, "增删卜易序");

    let mut overridden = default_ingest_args();
    overridden.preface_title = Some("自序".to_string());
    assert_eq!(book_profile(&overridden).preface_title, "自序");
}

#[test]
fn render_ingest_command_includes_profile_and_thresholds() {
    let mut args = default_ingest_args();
    args.target_docs = vec!["zengshanbuyi".to_string()];
    args.emit_chunk_manifest = true;

    let rendered = render_ingest_command(&args);
    assert!(rendered.starts_with("guji ingest --cache-root .cache/guji"));
    assert!(rendered.contains("--target-doc zengshanbuyi"));
    assert!(rendered.contains("--emit-chunk-manifest"));
    assert!(rendered.contains("--book-title 增删卜易"));
    assert!(rendered.contains("--chapter-split-threshold 1500"));
    assert!(rendered.contains("--min-paragraph-chars 50"));
}

#[test]
fn parse_then_chunk_preserves_emission_order() {
    let parser = test_parser();
    let chunker = test_chunker();

    let body = "天行健，君子以自强不息。".repeat(200);
    let mut lines = owned_lines(&["增删卜易序", "序文一句。", "【卷之一】", "一、乾坎艮震章"]);
    lines.push(body);
    lines.push("[乾按]此说最长。".to_string());

    let full_text = lines.join("\n");
    let structure = parser.parse(&lines);
    let output = chunker.chunk(&structure, &full_text);

    assert_eq!(output.chunks[0].kind.block_type(), "preface");
    assert_eq!(output.chunks[1].kind.block_type(), "volume_title");
    for chunk in &output.chunks[2..] {
        assert_eq!(chunk.kind.block_type(), "chapter_paragraph");
    }
    assert!(output.chunks.len() >= 4);

    // Annotations survive into the chunked chapter text.
    let annotated = output
        .chunks
        .iter()
        .any(|chunk| chunk.content.contains("[乾按]此说最长。"));
    assert!(annotated);
}
