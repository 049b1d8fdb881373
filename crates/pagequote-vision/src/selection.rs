//! 드래그 선택 엔진.
//!
//! 인식된 텍스트 줄의 화면 좌표를 유지하고, 드래그 사각형과 AABB 교차하는 줄을 고른다.
//! 한 페이지의 줄 수는 보통 수십 개라 포인터 이동마다 전체를 선형 재검사한다.
//!
//! 상태 전이: `Idle → Selecting (down) → Selecting (move, 반복) → Idle (up, 선택 유지)`
//! → `Idle (크롭 요청 또는 선택 해제)`

use tracing::{debug, trace};

use pagequote_core::models::geometry::{
    DisplayPoint, DisplayRect, DisplayScale, DisplaySize, ImageSize,
};
use pagequote_core::models::text_line::{RecognizedTextLine, ScaledTextLine};

// ============================================================
// TextLineLayer: 화면 배율이 적용된 줄 목록
// ============================================================

/// 이미지 한 장의 화면 배율 적용 텍스트 줄
#[derive(Debug, Clone)]
pub struct TextLineLayer {
    image_size: ImageSize,
    scale: DisplayScale,
    lines: Vec<ScaledTextLine>,
}

impl TextLineLayer {
    pub fn new(image_size: ImageSize, lines: Vec<RecognizedTextLine>, display_width: f64) -> Self {
        let scale = DisplayScale::fit_width(image_size, display_width);
        let lines = lines
            .into_iter()
            .map(|line| ScaledTextLine::new(line, scale))
            .collect();
        Self {
            image_size,
            scale,
            lines,
        }
    }

    /// 표시 너비 변경 → 모든 줄의 화면 좌표 재계산
    pub fn rescale(&mut self, display_width: f64) {
        self.scale = DisplayScale::fit_width(self.image_size, display_width);
        for line in &mut self.lines {
            line.rescale(self.scale);
        }
    }

    pub fn lines(&self) -> &[ScaledTextLine] {
        &self.lines
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn scale(&self) -> DisplayScale {
        self.scale
    }

    pub fn display_size(&self) -> DisplaySize {
        self.scale.display_size(self.image_size)
    }

    /// `rect`와 교차하는 줄 (줄 순서 유지)
    pub fn intersecting<'a>(
        &'a self,
        rect: &'a DisplayRect,
    ) -> impl Iterator<Item = &'a ScaledTextLine> + 'a {
        self.lines
            .iter()
            .filter(move |line| line.display_bounds().intersects(rect))
    }
}

// ============================================================
// SelectionSession: 드래그 상태 머신
// ============================================================

/// 드래그 제스처 상태
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Selecting { start: DisplayPoint },
}

/// 이미지 한 장의 수동 선택 세션
///
/// 세션이 끝나거나 다른 이미지를 고르면 줄 목록과 함께 폐기된다.
#[derive(Debug, Clone)]
pub struct SelectionSession {
    image_id: String,
    layer: TextLineLayer,
    state: DragState,
    selection: Option<DisplayRect>,
    /// 줄 순서와 같은 인덱스의 선택 여부
    selected: Vec<bool>,
}

impl SelectionSession {
    pub fn new(image_id: impl Into<String>, layer: TextLineLayer) -> Self {
        let selected = vec![false; layer.lines().len()];
        Self {
            image_id: image_id.into(),
            layer,
            state: DragState::Idle,
            selection: None,
            selected,
        }
    }

    pub fn image_id(&self) -> &str {
        &self.image_id
    }

    pub fn layer(&self) -> &TextLineLayer {
        &self.layer
    }

    pub fn state(&self) -> DragState {
        self.state
    }

    /// 현재(또는 마지막) 드래그 사각형
    pub fn selection_rect(&self) -> Option<&DisplayRect> {
        self.selection.as_ref()
    }

    /// 드래그 시작: 기존 탭/드래그 선택을 모두 지우고 새로 시작
    pub fn pointer_down(&mut self, point: DisplayPoint) {
        self.reset_selection();
        self.state = DragState::Selecting { start: point };
        self.update_rect(point);
    }

    /// 드래그 중 이동: 시작점과 현재점만으로 선택을 다시 계산
    pub fn pointer_move(&mut self, point: DisplayPoint) {
        if let DragState::Selecting { .. } = self.state {
            self.update_rect(point);
        }
    }

    /// 드래그 종료: 선택 사각형은 크롭 요청을 위해 유지
    pub fn pointer_up(&mut self, point: DisplayPoint) {
        if let DragState::Selecting { .. } = self.state {
            self.update_rect(point);
            self.state = DragState::Idle;
            debug!(
                image_id = %self.image_id,
                selected = self.selected_count(),
                "드래그 선택 완료"
            );
        }
    }

    /// 줄 하나 탭 선택 토글 → 찾았는지 여부
    pub fn tap_line(&mut self, line_id: &str) -> bool {
        match self.line_index(line_id) {
            Some(idx) => {
                self.selected[idx] = !self.selected[idx];
                true
            }
            None => false,
        }
    }

    /// 선택 해제 (사각형 포함)
    pub fn clear(&mut self) {
        self.reset_selection();
        self.state = DragState::Idle;
    }

    /// 크롭 요청용으로 완료된 선택 사각형을 꺼내고 세션을 Idle로 되돌린다
    ///
    /// 드래그 진행 중이면 `None`.
    pub fn take_selection(&mut self) -> Option<DisplayRect> {
        if self.state != DragState::Idle {
            return None;
        }
        let rect = self.selection.take();
        self.selected.iter_mut().for_each(|s| *s = false);
        rect
    }

    /// 표시 너비 변경: 화면 좌표가 바뀌므로 선택도 해제
    pub fn rescale(&mut self, display_width: f64) {
        self.layer.rescale(display_width);
        self.clear();
    }

    pub fn is_selected(&self, line_id: &str) -> bool {
        self.line_index(line_id)
            .map(|idx| self.selected[idx])
            .unwrap_or(false)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.iter().filter(|s| **s).count()
    }

    /// 선택된 줄 (줄 순서)
    pub fn selected_lines(&self) -> Vec<&ScaledTextLine> {
        self.layer
            .lines()
            .iter()
            .zip(&self.selected)
            .filter(|(_, selected)| **selected)
            .map(|(line, _)| line)
            .collect()
    }

    /// 선택된 줄 텍스트를 읽기 순서로 이어 붙임
    pub fn selected_text(&self) -> String {
        self.selected_lines()
            .iter()
            .map(|line| line.line().text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn update_rect(&mut self, point: DisplayPoint) {
        let DragState::Selecting { start } = self.state else {
            return;
        };
        let rect = DisplayRect::from_drag(start, point);
        for (flag, line) in self.selected.iter_mut().zip(self.layer.lines()) {
            *flag = line.display_bounds().intersects(&rect);
        }
        trace!(rect = %rect, selected = self.selected.iter().filter(|s| **s).count(), "선택 갱신");
        self.selection = Some(rect);
    }

    fn reset_selection(&mut self) {
        self.selection = None;
        self.selected.iter_mut().for_each(|s| *s = false);
    }

    fn line_index(&self, line_id: &str) -> Option<usize> {
        self.layer
            .lines()
            .iter()
            .position(|line| line.line().id == line_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagequote_core::models::geometry::PixelRect;

    /// 1000x1500 이미지, 500px 표시 (배율 0.5)
    fn layer() -> TextLineLayer {
        let lines = vec![
            RecognizedTextLine::new("l1", "첫째 줄입니다", PixelRect::new(100.0, 100.0, 800.0, 40.0)),
            RecognizedTextLine::new("l2", "둘째 줄입니다", PixelRect::new(100.0, 160.0, 800.0, 40.0)),
            RecognizedTextLine::new("l3", "셋째 줄입니다", PixelRect::new(100.0, 220.0, 800.0, 40.0)),
            RecognizedTextLine::new("l4", "아래쪽 줄", PixelRect::new(100.0, 1200.0, 400.0, 40.0)),
        ];
        TextLineLayer::new(ImageSize::new(1000, 1500), lines, 500.0)
    }

    fn pt(x: f64, y: f64) -> DisplayPoint {
        DisplayPoint::new(x, y)
    }

    fn selected_ids(session: &SelectionSession) -> Vec<String> {
        session
            .selected_lines()
            .iter()
            .map(|l| l.line().id.clone())
            .collect()
    }

    #[test]
    fn layer_scales_lines() {
        let layer = layer();
        assert_eq!(
            *layer.lines()[0].display_bounds(),
            DisplayRect::new(50.0, 50.0, 400.0, 20.0)
        );
        assert!((layer.display_size().height - 750.0).abs() < f64::EPSILON);
    }

    #[test]
    fn drag_selects_intersecting_lines() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(60.0, 60.0));
        session.pointer_move(pt(200.0, 90.0));
        session.pointer_up(pt(200.0, 90.0));

        assert_eq!(selected_ids(&session), vec!["l1", "l2"]);
        assert_eq!(session.state(), DragState::Idle);
        assert_eq!(
            session.selection_rect(),
            Some(&DisplayRect::new(60.0, 60.0, 140.0, 30.0))
        );
        assert_eq!(session.selected_text(), "첫째 줄입니다\n둘째 줄입니다");
    }

    #[test]
    fn containing_rect_always_selects_line() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(0.0, 0.0));
        session.pointer_up(pt(500.0, 750.0));
        assert_eq!(session.selected_count(), 4);
    }

    #[test]
    fn zero_area_drag_away_from_lines_selects_nothing() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(10.0, 400.0));
        session.pointer_up(pt(10.0, 400.0));
        assert_eq!(session.selected_count(), 0);
    }

    #[test]
    fn reverse_drag_selects_same_lines() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(200.0, 90.0));
        session.pointer_up(pt(60.0, 60.0));
        assert_eq!(selected_ids(&session), vec!["l1", "l2"]);
    }

    #[test]
    fn intermediate_moves_do_not_accumulate() {
        let mut direct = SelectionSession::new("img", layer());
        direct.pointer_down(pt(60.0, 60.0));
        direct.pointer_up(pt(200.0, 70.0));

        let mut wandering = SelectionSession::new("img", layer());
        wandering.pointer_down(pt(60.0, 60.0));
        // 모든 줄을 훑고 지나감
        wandering.pointer_move(pt(300.0, 700.0));
        wandering.pointer_move(pt(250.0, 130.0));
        wandering.pointer_up(pt(200.0, 70.0));

        assert_eq!(selected_ids(&direct), vec!["l1"]);
        assert_eq!(selected_ids(&wandering), selected_ids(&direct));
        assert_eq!(wandering.selection_rect(), direct.selection_rect());
    }

    #[test]
    fn new_drag_clears_tap_selection() {
        let mut session = SelectionSession::new("img", layer());
        assert!(session.tap_line("l4"));
        assert!(session.is_selected("l4"));

        session.pointer_down(pt(60.0, 60.0));
        assert!(!session.is_selected("l4"));
        session.pointer_up(pt(70.0, 70.0));
        assert_eq!(selected_ids(&session), vec!["l1"]);
    }

    #[test]
    fn tap_toggles_and_unknown_line_is_ignored() {
        let mut session = SelectionSession::new("img", layer());
        assert!(session.tap_line("l2"));
        assert!(session.tap_line("l2"));
        assert!(!session.is_selected("l2"));
        assert!(!session.tap_line("없는 줄"));
    }

    #[test]
    fn move_without_down_is_ignored() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_move(pt(100.0, 100.0));
        session.pointer_up(pt(100.0, 100.0));
        assert!(session.selection_rect().is_none());
        assert_eq!(session.state(), DragState::Idle);
    }

    #[test]
    fn take_selection_only_when_idle() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(60.0, 60.0));
        session.pointer_move(pt(200.0, 90.0));
        assert!(session.take_selection().is_none());

        session.pointer_up(pt(200.0, 90.0));
        let rect = session.take_selection().unwrap();
        assert_eq!(rect, DisplayRect::new(60.0, 60.0, 140.0, 30.0));
        assert!(session.selection_rect().is_none());
        assert_eq!(session.selected_count(), 0);
    }

    #[test]
    fn rescale_recomputes_and_clears() {
        let mut session = SelectionSession::new("img", layer());
        session.pointer_down(pt(0.0, 0.0));
        session.pointer_up(pt(500.0, 750.0));

        session.rescale(250.0);
        assert_eq!(session.selected_count(), 0);
        assert_eq!(
            *session.layer().lines()[0].display_bounds(),
            DisplayRect::new(25.0, 25.0, 200.0, 10.0)
        );
    }
}
