// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::UserType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Login,
    Bills,
    NewBill,
    Dashboard,
}

impl Route {
    pub const ALL: [Self; 4] = [Self::Login, Self::Bills, Self::NewBill, Self::Dashboard];

    pub const fn path(self) -> &'static str {
        match self {
            Self::Login => "/",
            Self::Bills => "#employee/bills",
            Self::NewBill => "#employee/bill/new",
            Self::Dashboard => "#admin/dashboard",
        }
    }

    pub fn parse(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|route| route.path() == path)
    }

    pub const fn home_for(user_type: UserType) -> Self {
        match user_type {
            UserType::Employee => Self::Bills,
            UserType::Admin => Self::Dashboard,
        }
    }
}

/// Switches the visible page. Assumed to always succeed.
pub trait Navigator {
    fn navigate(&mut self, route: Route);
}

impl<F> Navigator for F
where
    F: FnMut(Route),
{
    fn navigate(&mut self, route: Route) {
        self(route);
    }
}
