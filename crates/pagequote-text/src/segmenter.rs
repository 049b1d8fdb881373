//! 문장 분리기.
//!
//! 줄바꿈 하나는 소프트 랩(공백), 두 개 이상은 문단 경계로 본다.
//! 문단 경계를 먼저 표식으로 바꾼 뒤 남은 줄바꿈을 접어야
//! 두 규칙이 하나의 정규식 안에서 우선순위를 다투지 않는다.

use once_cell::sync::Lazy;
use regex::Regex;

/// 기본 최소 문장 길이 (문자 수)
pub const DEFAULT_MIN_SENTENCE_CHARS: usize = 5;

/// 문단 경계 표식 (사용자 정의 영역 문자)
const PARAGRAPH_MARK: char = '\u{E000}';

/// 문장 종결 부호
const SENTENCE_TERMINALS: &[char] = &['.', '!', '?', '。', '！', '？'];

static PARAGRAPH_BREAK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\n[ \t\x0B\x0C\u{3000}]*\n\s*").expect("static regex"));

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("static regex"));

static DISALLOWED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"[^\w\s가-힣ㄱ-ㅎㅏ-ㅣ.,!?;:。！？、…·'"“”‘’«»()\[\]{}<>《》〈〉「」『』\-–—~%/]"#,
    )
    .expect("static regex")
});

/// 최소 길이 임계값을 가진 문장 분리기
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SentenceSegmenter {
    min_chars: usize,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SENTENCE_CHARS)
    }
}

impl SentenceSegmenter {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    pub fn min_chars(&self) -> usize {
        self.min_chars
    }

    /// 텍스트 → 문장 목록 (종결 부호 유지, 짧은 조각 제거)
    pub fn segment(&self, text: &str) -> Vec<String> {
        // 입력에 이미 있던 표식 문자는 공백으로 바꿔 문단 경계와 구분
        let normalized = text
            .replace(PARAGRAPH_MARK, " ")
            .replace("\r\n", "\n")
            .replace('\r', "\n");
        let marked = PARAGRAPH_BREAK_RE.replace_all(&normalized, PARAGRAPH_MARK.to_string());
        let flattened = marked.replace('\n', " ");

        flattened
            .split(PARAGRAPH_MARK)
            .map(collapse_whitespace)
            .flat_map(|paragraph| split_sentences(&paragraph))
            .filter(|s| self.is_long_enough(s))
            .collect()
    }

    /// 분리 → 정제 → 길이 재필터
    ///
    /// 정제 과정에서 문장이 임계값보다 짧아질 수 있어 필터를 한 번 더 적용한다.
    pub fn process_ocr_text(&self, text: &str) -> Vec<String> {
        self.segment(text)
            .iter()
            .map(|s| clean_sentence(s))
            .filter(|s| self.is_long_enough(s))
            .collect()
    }

    fn is_long_enough(&self, sentence: &str) -> bool {
        sentence.chars().count() >= self.min_chars
    }
}

/// 기본 임계값으로 문장 분리
pub fn segment(text: &str) -> Vec<String> {
    SentenceSegmenter::default().segment(text)
}

/// 기본 임계값으로 분리 + 정제
pub fn process_ocr_text(text: &str) -> Vec<String> {
    SentenceSegmenter::default().process_ocr_text(text)
}

/// 허용 목록 밖의 문자를 삭제하고 공백을 정리한다 (치환 없음, 멱등)
pub fn clean_sentence(sentence: &str) -> String {
    let stripped = DISALLOWED_RE.replace_all(sentence, "");
    collapse_whitespace(&stripped)
}

fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// 종결 부호 + 공백 위치에서 자른다. 끝의 부호 없는 조각도 문장으로 남긴다.
fn split_sentences(paragraph: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = paragraph.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        if !SENTENCE_TERMINALS.contains(&c) {
            continue;
        }
        if let Some(&(next_idx, next)) = chars.peek() {
            if next.is_whitespace() {
                push_trimmed(&mut sentences, &paragraph[start..i + c.len_utf8()]);
                start = next_idx;
            }
        }
    }
    push_trimmed(&mut sentences, &paragraph[start..]);

    sentences
}

fn push_trimmed(out: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}
