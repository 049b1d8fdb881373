//! 후보 집합 관리자.
//!
//! 캡처 흐름 동안의 모든 후보를 메모리에 들고 토글/편집/삭제를 처리한다.
//! id 조회는 인덱스 맵으로 O(1)이고, 삭제 시에만 인덱스를 다시 만든다.

use std::collections::HashMap;

use tracing::debug;

use pagequote_core::models::candidate::{Candidate, QuoteDraft};

/// 이미지 하나의 후보 그룹 (표시용)
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateGroup<'a> {
    pub image_id: &'a str,
    pub candidates: Vec<&'a Candidate>,
}

/// 캡처 세션 범위의 후보 집합
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    /// id → `items` 위치 (같은 id가 여러 번 들어오면 첫 항목)
    index: HashMap<String, usize>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 후보 추가 (항상 뒤에 붙임, 기존 id와 중복 검사하지 않음)
    pub fn add_candidates(&mut self, candidates: impl IntoIterator<Item = Candidate>) {
        for candidate in candidates {
            let pos = self.items.len();
            self.index.entry(candidate.id().to_string()).or_insert(pos);
            self.items.push(candidate);
        }
    }

    /// 선택 토글 → 토글 후 상태 (없는 id면 `None`)
    pub fn toggle(&mut self, id: &str) -> Option<bool> {
        let candidate = self.get_mut(id)?;
        candidate.selected = !candidate.selected;
        Some(candidate.selected)
    }

    /// 선택 상태 지정 → 찾았는지 여부
    pub fn set_selected(&mut self, id: &str, selected: bool) -> bool {
        match self.get_mut(id) {
            Some(candidate) => {
                candidate.selected = selected;
                true
            }
            None => false,
        }
    }

    /// 본문 편집 → 찾았는지 여부
    pub fn edit_content(&mut self, id: &str, content: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(candidate) => {
                candidate.content = content.into();
                true
            }
            None => false,
        }
    }

    /// 후보 하나 삭제
    pub fn remove(&mut self, id: &str) -> Option<Candidate> {
        let pos = *self.index.get(id)?;
        let removed = self.items.remove(pos);
        self.rebuild_index();
        Some(removed)
    }

    /// 이미지 하나의 후보 전체 삭제 → 삭제된 개수
    pub fn remove_image(&mut self, image_id: &str) -> usize {
        let before = self.items.len();
        self.items.retain(|c| c.image_id() != image_id);
        let removed = before - self.items.len();
        if removed > 0 {
            self.rebuild_index();
            debug!(image_id, count = removed, "이미지 후보 삭제");
        }
        removed
    }

    /// 전체 삭제
    pub fn remove_all(&mut self) {
        self.items.clear();
        self.index.clear();
    }

    pub fn get(&self, id: &str) -> Option<&Candidate> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_count(&self) -> usize {
        self.items.iter().filter(|c| c.selected).count()
    }

    /// 이미지별 그룹 (처음 등장한 이미지 순서, 그룹 내부 순서 유지)
    ///
    /// 후보가 없는 이미지는 그룹으로 나오지 않는다.
    pub fn group_by_image(&self) -> Vec<CandidateGroup<'_>> {
        let mut groups: Vec<CandidateGroup<'_>> = Vec::new();
        let mut positions: HashMap<&str, usize> = HashMap::new();

        for candidate in &self.items {
            let image_id = candidate.image_id();
            match positions.get(image_id) {
                Some(&pos) => groups[pos].candidates.push(candidate),
                None => {
                    positions.insert(image_id, groups.len());
                    groups.push(CandidateGroup {
                        image_id,
                        candidates: vec![candidate],
                    });
                }
            }
        }
        groups
    }

    /// `image_order` 순서로 정렬한 이미지별 그룹
    ///
    /// 순서 목록에 없는 이미지는 뒤쪽에 처음 등장한 순서대로 붙는다.
    pub fn group_by_image_ordered<'o, I>(&self, image_order: I) -> Vec<CandidateGroup<'_>>
    where
        I: IntoIterator<Item = &'o str>,
    {
        let rank: HashMap<&'o str, usize> = image_order
            .into_iter()
            .enumerate()
            .map(|(pos, id)| (id, pos))
            .collect();
        let mut groups = self.group_by_image();
        groups.sort_by_key(|g| rank.get(g.image_id).copied().unwrap_or(usize::MAX));
        groups
    }

    /// 저장 대상(선택됨 + 공백 아닌 본문) → 저장소 전달 형태
    pub fn to_quote_drafts(&self, page_numbers: &HashMap<String, u32>) -> Vec<QuoteDraft> {
        self.items
            .iter()
            .filter(|c| c.is_savable())
            .map(|c| QuoteDraft {
                content: c.content.trim().to_string(),
                image_id: c.image_id().to_string(),
                page_number: page_numbers.get(c.image_id()).copied(),
            })
            .collect()
    }

    fn get_mut(&mut self, id: &str) -> Option<&mut Candidate> {
        let pos = *self.index.get(id)?;
        self.items.get_mut(pos)
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (pos, candidate) in self.items.iter().enumerate() {
            self.index.entry(candidate.id().to_string()).or_insert(pos);
        }
    }
}
