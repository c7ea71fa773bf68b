use std::collections::BTreeMap;
use std::fmt;

/// Name of a remote list resource, e.g. `analyses`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ResourceKey(String);

impl ResourceKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResourceKey {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ResourceKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// One addressable slice of a list resource. Two requests with identical
/// fields address the same cache entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageRequest {
    pub resource_key: ResourceKey,
    pub page: u32,
    pub page_size: u32,
    pub filters: BTreeMap<String, String>,
}

impl PageRequest {
    /// Page and page size are clamped to at least 1.
    pub fn new(resource_key: impl Into<ResourceKey>, page: u32, page_size: u32) -> Self {
        Self {
            resource_key: resource_key.into(),
            page: page.max(1),
            page_size: page_size.max(1),
            filters: BTreeMap::new(),
        }
    }

    pub fn with_filter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(name.into(), value.into());
        self
    }

    pub fn with_filters(mut self, filters: BTreeMap<String, String>) -> Self {
        self.filters = filters;
        self
    }

    /// Same resource, size and filters, different page.
    pub fn at_page(&self, page: u32) -> Self {
        Self {
            page: page.max(1),
            ..self.clone()
        }
    }
}

impl fmt::Display for PageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}[page={} size={}",
            self.resource_key, self.page, self.page_size
        )?;
        for (name, value) in &self.filters {
            write!(f, " {name}={value}")?;
        }
        f.write_str("]")
    }
}

/// One resolved page of a list resource, items in server order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_items: u64,
    pub total_pages: u32,
    pub page: u32,
    pub page_size: u32,
}

impl<T> Page<T> {
    /// Builds a page, deriving `total_pages` from the item total.
    pub fn new(items: Vec<T>, total_items: u64, page: u32, page_size: u32) -> Self {
        Self {
            items,
            total_items,
            total_pages: total_pages(total_items, page_size),
            page,
            page_size,
        }
    }

    /// The page served for a collection that does not exist or is empty.
    pub fn empty(page: u32, page_size: u32) -> Self {
        Self::new(Vec::new(), 0, page, page_size)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_items: self.total_items,
            total_pages: self.total_pages,
            page: self.page,
            page_size: self.page_size,
        }
    }
}

pub fn total_pages(total_items: u64, page_size: u32) -> u32 {
    if page_size == 0 {
        return 0;
    }
    let pages = total_items.div_ceil(u64::from(page_size));
    u32::try_from(pages).unwrap_or(u32::MAX)
}

/// One entry of a rendered pagination bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageLink {
    Page { number: u32, current: bool },
    Ellipsis,
}

/// Pagination bar: first and last page, the pages adjacent to the current
/// one, and an ellipsis two steps away from the current page.
pub fn page_links(current: u32, total_pages: u32) -> Vec<PageLink> {
    if total_pages <= 1 {
        return Vec::new();
    }
    let mut links = Vec::new();
    for number in 1..=total_pages {
        let distance = number.abs_diff(current);
        if number == 1 || number == total_pages || distance <= 1 {
            links.push(PageLink::Page {
                number,
                current: number == current,
            });
        } else if distance == 2 {
            links.push(PageLink::Ellipsis);
        }
    }
    links
}
