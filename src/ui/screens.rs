use std::collections::HashSet;

use crate::models::{BindingView, CategorySection, Game};

/// A game's layout: one table per category plus the set of actions whose
/// binding differs from the default game.
pub(crate) struct BindingsScreen {
    pub(crate) game: Game,
    pub(crate) sections: Vec<CategorySection>,
    pub(crate) differences: HashSet<i64>,
    /// Index into the flattened rows across all sections.
    pub(crate) selected: usize,
    pub(crate) print_layout: bool,
}

impl BindingsScreen {
    pub(crate) fn new(
        game: Game,
        sections: Vec<CategorySection>,
        differences: HashSet<i64>,
    ) -> Self {
        let mut screen = Self {
            game,
            sections,
            differences,
            selected: 0,
            print_layout: false,
        };
        screen.ensure_in_bounds();
        screen
    }

    pub(crate) fn row_count(&self) -> usize {
        self.sections
            .iter()
            .map(|section| section.bindings.len())
            .sum()
    }

    /// Section and row of the selection, skipping empty sections.
    pub(crate) fn position(&self) -> Option<(usize, usize)> {
        let mut remaining = self.selected;
        for (section_idx, section) in self.sections.iter().enumerate() {
            if remaining < section.bindings.len() {
                return Some((section_idx, remaining));
            }
            remaining -= section.bindings.len();
        }
        None
    }

    pub(crate) fn current(&self) -> Option<&BindingView> {
        self.position()
            .map(|(section, row)| &self.sections[section].bindings[row])
    }

    pub(crate) fn is_different(&self, action_id: i64) -> bool {
        self.differences.contains(&action_id)
    }

    pub(crate) fn move_selection(&mut self, offset: isize) {
        let count = self.row_count();
        if count == 0 {
            self.selected = 0;
            return;
        }
        let next = (self.selected as isize + offset).clamp(0, count as isize - 1);
        self.selected = next as usize;
    }

    pub(crate) fn select_first(&mut self) {
        self.selected = 0;
    }

    pub(crate) fn select_last(&mut self) {
        self.selected = self.row_count().saturating_sub(1);
    }

    pub(crate) fn ensure_in_bounds(&mut self) {
        let count = self.row_count();
        if count == 0 {
            self.selected = 0;
        } else if self.selected >= count {
            self.selected = count - 1;
        }
    }

    /// Move the selection onto the binding with `id`, if it is shown.
    pub(crate) fn focus_binding(&mut self, id: i64) -> bool {
        let found = self
            .sections
            .iter()
            .flat_map(|section| section.bindings.iter())
            .position(|binding| binding.id == id);
        if let Some(index) = found {
            self.selected = index;
        }
        found.is_some()
    }

    /// Swap in fresh rows for one category, leaving the other tables as they
    /// were.
    pub(crate) fn replace_section(&mut self, category_id: i64, bindings: Vec<BindingView>) {
        if let Some(section) = self
            .sections
            .iter_mut()
            .find(|section| section.category.id == category_id)
        {
            section.bindings = bindings;
        }
        self.ensure_in_bounds();
    }

    /// The selected category's binding ids with the current row swapped one
    /// step up (`-1`) or down (`1`). `None` when the row is already at that
    /// edge of its table.
    pub(crate) fn reordered_ids(&self, offset: isize) -> Option<(i64, i64, Vec<i64>)> {
        let (section_idx, row) = self.position()?;
        let section = &self.sections[section_idx];
        let target = row as isize + offset;
        if target < 0 || target as usize >= section.bindings.len() {
            return None;
        }

        let mut ids: Vec<i64> = section.bindings.iter().map(|binding| binding.id).collect();
        ids.swap(row, target as usize);
        Some((section.category.id, ids[target as usize], ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, GameType};

    fn binding(id: i64, category_id: i64) -> BindingView {
        BindingView {
            id,
            game_id: 1,
            action_id: id * 10,
            action_name: format!("action {id}"),
            category_id,
            key_id: 1,
            key_name: "W".to_string(),
            modifier_id: 1,
            modifier_name: "tap".to_string(),
            description: String::new(),
            sort_order: 0,
        }
    }

    fn section(category_id: i64, ids: &[i64]) -> CategorySection {
        CategorySection {
            category: Category {
                id: category_id,
                name: format!("category {category_id}"),
                description: String::new(),
            },
            bindings: ids.iter().map(|id| binding(*id, category_id)).collect(),
        }
    }

    fn screen() -> BindingsScreen {
        let game = Game {
            id: 1,
            name: "apex".to_string(),
            game_type: GameType::Dumb,
            image: None,
        };
        BindingsScreen::new(
            game,
            vec![section(1, &[1, 2, 3]), section(2, &[]), section(3, &[4])],
            HashSet::from([20]),
        )
    }

    #[test]
    fn selection_walks_across_sections() {
        let mut screen = screen();
        assert_eq!(screen.row_count(), 4);
        screen.move_selection(3);
        assert_eq!(screen.position(), Some((2, 0)));
        assert_eq!(screen.current().map(|b| b.id), Some(4));
        screen.move_selection(10);
        assert_eq!(screen.selected, 3);
        screen.select_first();
        assert!(!screen.is_different(screen.current().unwrap().action_id));
        screen.move_selection(1);
        assert!(screen.is_different(screen.current().unwrap().action_id));
    }

    #[test]
    fn reorder_stays_inside_category() {
        let mut screen = screen();
        assert!(screen.reordered_ids(-1).is_none());
        assert_eq!(screen.reordered_ids(1), Some((1, 1, vec![2, 1, 3])));

        screen.select_last();
        assert!(screen.reordered_ids(1).is_none());
        assert!(screen.reordered_ids(-1).is_none());
    }

    #[test]
    fn replacing_a_section_keeps_selection_valid() {
        let mut screen = screen();
        screen.select_last();
        screen.replace_section(3, Vec::new());
        assert_eq!(screen.selected, 2);
        assert!(screen.focus_binding(1));
        assert_eq!(screen.selected, 0);
        assert!(!screen.focus_binding(99));
    }
}
