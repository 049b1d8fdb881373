//! 구조화 추출 결과 정규화.
//!
//! 이미지 한 장의 문단 목록과 밑줄 문장 목록을 하나의 후보 목록으로 합친다.
//! OCR 문단 경계와 밑줄 경계는 거의 일치하지 않으므로 겹침 판정은
//! 동등 비교가 아니라 양방향 부분 문자열 포함으로 한다.

use std::collections::HashSet;

use tracing::debug;

use pagequote_core::config::{ExtractionConfig, Granularity, OverlapPolicy};
use pagequote_core::models::candidate::Candidate;
use pagequote_core::models::extraction::{ParsedExtraction, StructuredOcrResult};

use crate::segmenter::SentenceSegmenter;

/// 문단 + 밑줄 문장 → 정렬/중복 제거된 후보 목록
#[derive(Debug, Clone)]
pub struct ExtractionNormalizer {
    config: ExtractionConfig,
    segmenter: SentenceSegmenter,
}

impl ExtractionNormalizer {
    pub fn new(config: ExtractionConfig, segmenter: SentenceSegmenter) -> Self {
        Self { config, segmenter }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// 태그된 해석 결과 정규화
    ///
    /// `Fallback`이면 원문 전체를 밑줄 없는 문단 하나로 취급한다.
    pub fn normalize(&self, image_id: &str, parsed: &ParsedExtraction) -> Vec<Candidate> {
        match parsed {
            ParsedExtraction::Parsed(result) => self.normalize_structured(image_id, result),
            ParsedExtraction::Fallback { raw_text } => {
                let as_paragraph = StructuredOcrResult {
                    paragraphs: vec![raw_text.clone()],
                    ..StructuredOcrResult::default()
                };
                self.normalize_structured(image_id, &as_paragraph)
            }
        }
    }

    /// 이미지 한 장의 구조화 결과 정규화
    ///
    /// 밑줄 후보가 항상 앞에 오고, 각 그룹 안에서는 생성 순서를 유지한다.
    pub fn normalize_structured(
        &self,
        image_id: &str,
        result: &StructuredOcrResult,
    ) -> Vec<Candidate> {
        let mut emitted = Emitted::new(image_id);

        let underlines: Vec<&str> = result
            .underlined_sentences
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect();
        for underline in &underlines {
            emitted.push(Candidate::underlined(image_id, *underline));
        }

        for paragraph in &result.paragraphs {
            let paragraph = paragraph.trim();
            if paragraph.is_empty() {
                continue;
            }
            let Some(retained) = self.resolve_overlap(paragraph, &underlines) else {
                debug!(image_id, "밑줄과 겹치는 문단 제외");
                continue;
            };

            match self.config.granularity {
                Granularity::Paragraph => emitted.push(Candidate::paragraph(
                    image_id,
                    retained,
                    self.config.preselect_paragraphs,
                )),
                Granularity::Sentence => {
                    for sentence in self.segmenter.process_ocr_text(&retained) {
                        emitted.push(Candidate::paragraph(
                            image_id,
                            sentence,
                            self.config.preselect_paragraphs,
                        ));
                    }
                }
            }
        }

        let mut candidates = emitted.into_inner();
        candidates.sort_by_key(|c| !c.is_underlined());

        debug!(
            image_id,
            count = candidates.len(),
            underlined = underlines.len(),
            "구조화 결과 정규화 완료"
        );
        candidates
    }

    /// 겹침 정책 적용 → 유지할 텍스트 (없으면 `None`)
    fn resolve_overlap(&self, paragraph: &str, underlines: &[&str]) -> Option<String> {
        let mut overlapping: Vec<&str> = underlines
            .iter()
            .copied()
            .filter(|u| paragraph.contains(u) || u.contains(paragraph))
            .collect();
        if overlapping.is_empty() {
            return Some(paragraph.to_string());
        }

        match self.config.overlap_policy {
            OverlapPolicy::SkipParagraph => None,
            OverlapPolicy::StripRemainder => {
                if overlapping.iter().any(|u| u.contains(paragraph)) {
                    return None;
                }
                // 긴 밑줄부터 지워야 짧은 밑줄이 긴 밑줄 일부를 먼저 갉아먹지 않는다
                overlapping.sort_by_key(|u| std::cmp::Reverse(u.chars().count()));
                let mut remainder = paragraph.to_string();
                for underline in overlapping {
                    remainder = remainder.replace(underline, "");
                }
                let remainder = remainder.trim();
                (remainder.chars().count() >= self.config.min_remainder_chars)
                    .then(|| remainder.to_string())
            }
        }
    }
}

/// 이미지 내 중복 제거 버퍼 (먼저 나온 쪽 유지)
struct Emitted<'a> {
    image_id: &'a str,
    seen: HashSet<String>,
    candidates: Vec<Candidate>,
}

impl<'a> Emitted<'a> {
    fn new(image_id: &'a str) -> Self {
        Self {
            image_id,
            seen: HashSet::new(),
            candidates: Vec::new(),
        }
    }

    fn push(&mut self, candidate: Candidate) {
        if self.seen.insert(candidate.content.clone()) {
            self.candidates.push(candidate);
        } else {
            debug!(image_id = self.image_id, "중복 후보 제외");
        }
    }

    fn into_inner(self) -> Vec<Candidate> {
        self.candidates
    }
}
