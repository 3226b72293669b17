// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{BillId, BillStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatusGroup {
    Pending,
    Accepted,
    Refused,
}

impl StatusGroup {
    pub const ALL: [Self; 3] = [Self::Pending, Self::Accepted, Self::Refused];

    /// One-based index used by the arrow and container element ids.
    pub const fn index(self) -> usize {
        match self {
            Self::Pending => 1,
            Self::Accepted => 2,
            Self::Refused => 3,
        }
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.into_iter().find(|group| group.index() == index)
    }

    pub const fn status(self) -> BillStatus {
        match self {
            Self::Pending => BillStatus::Pending,
            Self::Accepted => BillStatus::Accepted,
            Self::Refused => BillStatus::Refused,
        }
    }

    pub const fn title(self) -> &'static str {
        match self {
            Self::Pending => "En attente",
            Self::Accepted => "Validé",
            Self::Refused => "Refusé",
        }
    }

    pub fn arrow_target(self) -> String {
        format!("arrow-icon{}", self.index())
    }

    pub fn container_target(self) -> String {
        format!("status-bills-container{}", self.index())
    }

    const fn slot(self) -> usize {
        self.index() - 1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupVisibility {
    Collapsed,
    Expanded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditView {
    Summary,
    DetailForm,
}

/// Activation counter of the bill currently selected for review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditState {
    pub bill_id: BillId,
    pub counter: u32,
}

impl EditState {
    pub const fn view(&self) -> EditView {
        if self.counter % 2 == 1 {
            EditView::DetailForm
        } else {
            EditView::Summary
        }
    }
}

/// Visibility state of the review dashboard. Every counter starts at zero; selecting
/// a different bill restarts the edit counter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DashboardState {
    toggles: [u32; 3],
    edit: Option<EditState>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardCommand {
    ToggleGroup(StatusGroup),
    ToggleBill(BillId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardEvent {
    GroupExpanded(StatusGroup),
    GroupCollapsed(StatusGroup),
    DetailOpened(BillId),
    DetailClosed(BillId),
}

impl DashboardState {
    pub fn dispatch(&mut self, command: DashboardCommand) -> Vec<DashboardEvent> {
        match command {
            DashboardCommand::ToggleGroup(group) => {
                let counter = &mut self.toggles[group.slot()];
                *counter = counter.wrapping_add(1);
                let event = match self.visibility(group) {
                    GroupVisibility::Expanded => DashboardEvent::GroupExpanded(group),
                    GroupVisibility::Collapsed => DashboardEvent::GroupCollapsed(group),
                };
                vec![event]
            }
            DashboardCommand::ToggleBill(bill_id) => {
                let edit = match self.edit.take() {
                    Some(edit) if edit.bill_id == bill_id => EditState {
                        counter: edit.counter.wrapping_add(1),
                        ..edit
                    },
                    _ => EditState {
                        bill_id: bill_id.clone(),
                        counter: 1,
                    },
                };
                let event = match edit.view() {
                    EditView::DetailForm => DashboardEvent::DetailOpened(bill_id),
                    EditView::Summary => DashboardEvent::DetailClosed(bill_id),
                };
                self.edit = Some(edit);
                vec![event]
            }
        }
    }

    pub fn toggle_count(&self, group: StatusGroup) -> u32 {
        self.toggles[group.slot()]
    }

    pub fn visibility(&self, group: StatusGroup) -> GroupVisibility {
        if self.toggle_count(group) % 2 == 1 {
            GroupVisibility::Expanded
        } else {
            GroupVisibility::Collapsed
        }
    }

    pub fn edit(&self) -> Option<&EditState> {
        self.edit.as_ref()
    }

    /// The bill whose detail form is open, if any.
    pub fn open_bill(&self) -> Option<&BillId> {
        self.edit
            .as_ref()
            .filter(|edit| edit.view() == EditView::DetailForm)
            .map(|edit| &edit.bill_id)
    }
}

#[cfg(test)]
mod tests {
    use super::{
        DashboardCommand, DashboardEvent, DashboardState, EditView, GroupVisibility, StatusGroup,
    };
    use crate::BillId;

    #[test]
    fn groups_start_collapsed_and_toggle_independently() {
        let mut state = DashboardState::default();
        for group in StatusGroup::ALL {
            assert_eq!(state.visibility(group), GroupVisibility::Collapsed);
        }

        let events = state.dispatch(DashboardCommand::ToggleGroup(StatusGroup::Accepted));
        assert_eq!(events, vec![DashboardEvent::GroupExpanded(StatusGroup::Accepted)]);
        assert_eq!(
            state.visibility(StatusGroup::Accepted),
            GroupVisibility::Expanded
        );
        assert_eq!(
            state.visibility(StatusGroup::Pending),
            GroupVisibility::Collapsed
        );
    }

    #[test]
    fn second_toggle_collapses_group() {
        let mut state = DashboardState::default();
        state.dispatch(DashboardCommand::ToggleGroup(StatusGroup::Refused));
        let events = state.dispatch(DashboardCommand::ToggleGroup(StatusGroup::Refused));

        assert_eq!(events, vec![DashboardEvent::GroupCollapsed(StatusGroup::Refused)]);
        assert_eq!(state.toggle_count(StatusGroup::Refused), 2);
        assert_eq!(
            state.visibility(StatusGroup::Refused),
            GroupVisibility::Collapsed
        );
    }

    #[test]
    fn same_bill_alternates_between_detail_and_summary() {
        let mut state = DashboardState::default();
        let id = BillId::new("47qAXb6fIm2zOKkLzMro");

        let opened = state.dispatch(DashboardCommand::ToggleBill(id.clone()));
        assert_eq!(opened, vec![DashboardEvent::DetailOpened(id.clone())]);
        assert_eq!(state.open_bill(), Some(&id));

        let closed = state.dispatch(DashboardCommand::ToggleBill(id.clone()));
        assert_eq!(closed, vec![DashboardEvent::DetailClosed(id.clone())]);
        assert_eq!(state.open_bill(), None);
        assert_eq!(state.edit().map(|edit| edit.view()), Some(EditView::Summary));
    }

    #[test]
    fn switching_bills_resets_edit_counter() {
        let mut state = DashboardState::default();
        let first = BillId::new("first");
        let second = BillId::new("second");

        state.dispatch(DashboardCommand::ToggleBill(first.clone()));
        state.dispatch(DashboardCommand::ToggleBill(first));
        let events = state.dispatch(DashboardCommand::ToggleBill(second.clone()));

        assert_eq!(events, vec![DashboardEvent::DetailOpened(second.clone())]);
        assert_eq!(state.edit().map(|edit| edit.counter), Some(1));
        assert_eq!(state.open_bill(), Some(&second));
    }
}
