// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::{
    Bill, BillId, BillStatus, DashboardState, FilterOptions, GroupVisibility, StatusGroup,
    filtered_bills,
};

pub const ATTACHMENT_TARGET: &str = "icon-eye-d";
pub const ACCEPT_TARGET: &str = "btn-accept-bill";
pub const REFUSE_TARGET: &str = "btn-refuse-bill";
pub const COMMENT_TARGET: &str = "commentary2";

pub fn card_target(id: &BillId) -> String {
    format!("open-bill{id}")
}

/// Bills held by a page between fetch and re-render.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum PageData {
    #[default]
    Loading,
    Loaded(Vec<Bill>),
    Failed(String),
}

impl PageData {
    pub fn bills(&self) -> Option<&[Bill]> {
        match self {
            Self::Loaded(bills) => Some(bills),
            Self::Loading | Self::Failed(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DashboardAction {
    ToggleGroup(StatusGroup),
    OpenBill(BillId),
    ViewAttachment(BillId),
    Accept(BillId),
    Refuse(BillId),
}

/// Binds one activation target of the rendered page to an action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub target: String,
    pub action: DashboardAction,
}

impl Subscription {
    fn new(target: impl Into<String>, action: DashboardAction) -> Self {
        Self {
            target: target.into(),
            action,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavbarHeight {
    Regular,
    Extended,
}

impl NavbarHeight {
    pub const fn css(self) -> &'static str {
        match self {
            Self::Regular => "120vh",
            Self::Extended => "150vh",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CardView {
    pub bill: Bill,
    pub highlighted: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupView {
    pub group: StatusGroup,
    pub count: usize,
    pub visibility: GroupVisibility,
    pub cards: Vec<CardView>,
}

impl GroupView {
    pub const fn arrow_degrees(&self) -> u16 {
        match self.visibility {
            GroupVisibility::Expanded => 0,
            GroupVisibility::Collapsed => 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    Placeholder,
    Detail(Bill),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardView {
    pub groups: Vec<GroupView>,
    pub panel: PanelView,
    pub navbar: NavbarHeight,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageView {
    Loading,
    Error(String),
    Board(BoardView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub page: PageView,
    pub subscriptions: Vec<Subscription>,
}

impl DashboardView {
    pub fn subscriptions_for<'a>(
        &'a self,
        target: &'a str,
    ) -> impl Iterator<Item = &'a Subscription> + 'a {
        self.subscriptions
            .iter()
            .filter(move |subscription| subscription.target == target)
    }

    pub fn board(&self) -> Option<&BoardView> {
        match &self.page {
            PageView::Board(board) => Some(board),
            PageView::Loading | PageView::Error(_) => None,
        }
    }
}

/// Renders the dashboard from a state snapshot. The subscription list is rebuilt from
/// scratch on every call, so no target is ever bound twice.
pub fn render_dashboard(
    state: &DashboardState,
    data: &PageData,
    filter: &FilterOptions,
) -> DashboardView {
    let bills = match data {
        PageData::Loading => {
            return DashboardView {
                page: PageView::Loading,
                subscriptions: Vec::new(),
            };
        }
        PageData::Failed(message) => {
            return DashboardView {
                page: PageView::Error(message.clone()),
                subscriptions: Vec::new(),
            };
        }
        PageData::Loaded(bills) => bills.as_slice(),
    };

    let open_bill = state.open_bill();
    let mut subscriptions = Vec::new();
    let mut groups = Vec::with_capacity(StatusGroup::ALL.len());

    for group in StatusGroup::ALL {
        let visible = filtered_bills(Some(bills), group.status(), filter);
        let visibility = state.visibility(group);
        subscriptions.push(Subscription::new(
            group.arrow_target(),
            DashboardAction::ToggleGroup(group),
        ));

        let cards = match visibility {
            GroupVisibility::Collapsed => Vec::new(),
            GroupVisibility::Expanded => visible
                .iter()
                .map(|bill| {
                    subscriptions.push(Subscription::new(
                        card_target(&bill.id),
                        DashboardAction::OpenBill(bill.id.clone()),
                    ));
                    CardView {
                        highlighted: open_bill == Some(&bill.id),
                        bill: bill.clone(),
                    }
                })
                .collect(),
        };

        groups.push(GroupView {
            group,
            count: visible.len(),
            visibility,
            cards,
        });
    }

    let detail = open_bill.and_then(|id| bills.iter().find(|bill| &bill.id == id));
    let (panel, navbar) = match detail {
        Some(bill) => {
            subscriptions.push(Subscription::new(
                ATTACHMENT_TARGET,
                DashboardAction::ViewAttachment(bill.id.clone()),
            ));
            if bill.status == BillStatus::Pending {
                subscriptions.push(Subscription::new(
                    ACCEPT_TARGET,
                    DashboardAction::Accept(bill.id.clone()),
                ));
                subscriptions.push(Subscription::new(
                    REFUSE_TARGET,
                    DashboardAction::Refuse(bill.id.clone()),
                ));
            }
            (PanelView::Detail(bill.clone()), NavbarHeight::Extended)
        }
        None => (PanelView::Placeholder, NavbarHeight::Regular),
    };

    DashboardView {
        page: PageView::Board(BoardView {
            groups,
            panel,
            navbar,
        }),
        subscriptions,
    }
}
