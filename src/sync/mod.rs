// sync module - polled views, paging and write actions over a Fetcher

pub mod actions;
pub mod pager;
pub mod resources;
pub mod view;

pub use actions::Refresh;
pub use pager::{CursorPager, ListFilter, PagedList, Searchable};
pub use resources::{Dashboard, DeliveryFilter};
pub use view::{Snapshot, SyncView};
