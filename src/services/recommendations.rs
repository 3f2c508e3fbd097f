//! Paging and filtering of recommendation results.
//!
//! The chat shows five films per page while TMDB serves fixed blocks of
//! twenty, so the film-based track maps every UI page onto an upstream block
//! plus an offset inside it. The mapping assumes the upstream block size
//! stays at [`UPSTREAM_PAGE_SIZE`]; if TMDB changes it, pages come out short
//! or overlap.

use std::collections::HashSet;

use crate::models::{Candidate, FilmId};

/// Films shown per page in the chat
pub const UI_PAGE_SIZE: usize = 5;

/// Films per page returned by TMDB list endpoints
pub const UPSTREAM_PAGE_SIZE: usize = 20;

const UI_PAGES_PER_BLOCK: u32 = (UPSTREAM_PAGE_SIZE / UI_PAGE_SIZE) as u32;

/// Location of a UI page inside the upstream pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based upstream page to request
    pub upstream_page: u32,
    /// Index of the first item inside that upstream page
    pub offset: usize,
}

/// Maps a 1-based UI page onto `ceil(p / 4)` and `((p - 1) mod 4) * 5`
pub fn film_page_window(ui_page: u32) -> PageWindow {
    let ui_page = ui_page.max(1);
    PageWindow {
        upstream_page: (ui_page - 1) / UI_PAGES_PER_BLOCK + 1,
        offset: ((ui_page - 1) % UI_PAGES_PER_BLOCK) as usize * UI_PAGE_SIZE,
    }
}

/// Picks the page slice for film-based browsing
///
/// Unseen films are sliced first; when that slice is empty the raw block is
/// sliced instead. An empty result means there is nothing more to show.
pub fn select_film_page(
    results: &[Candidate],
    seen: &HashSet<FilmId>,
    offset: usize,
) -> Vec<Candidate> {
    let unseen: Vec<&Candidate> = results.iter().filter(|c| !seen.contains(&c.id)).collect();

    let page: Vec<Candidate> = unseen
        .into_iter()
        .skip(offset)
        .take(UI_PAGE_SIZE)
        .cloned()
        .collect();

    if !page.is_empty() {
        return page;
    }

    results.iter().skip(offset).take(UI_PAGE_SIZE).cloned().collect()
}

/// Picks the films shown for genre-based browsing
///
/// Every unseen film of the upstream page is shown; when all of them are
/// already saved, the first [`UI_PAGE_SIZE`] raw results are shown instead.
pub fn select_genre_page(results: &[Candidate], seen: &HashSet<FilmId>) -> Vec<Candidate> {
    let unseen: Vec<Candidate> = results
        .iter()
        .filter(|c| !seen.contains(&c.id))
        .cloned()
        .collect();

    if !unseen.is_empty() {
        return unseen;
    }

    results.iter().take(UI_PAGE_SIZE).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(ids: std::ops::Range<u64>) -> Vec<Candidate> {
        ids.map(|id| Candidate {
            id,
            title: format!("Film {}", id),
            release_year: None,
            genre_ids: vec![],
        })
        .collect()
    }

    fn ids(page: &[Candidate]) -> Vec<u64> {
        page.iter().map(|c| c.id).collect()
    }

    #[test]
    fn test_film_page_window_first_block() {
        assert_eq!(
            film_page_window(1),
            PageWindow {
                upstream_page: 1,
                offset: 0
            }
        );
        assert_eq!(
            film_page_window(4),
            PageWindow {
                upstream_page: 1,
                offset: 15
            }
        );
    }

    #[test]
    fn test_film_page_window_matches_formula() {
        for p in 1..=50u32 {
            let window = film_page_window(p);
            assert_eq!(window.upstream_page, (p + 3) / 4, "page {}", p);
            assert_eq!(window.offset, (((p - 1) % 4) * 5) as usize, "page {}", p);
        }
    }

    #[test]
    fn test_film_page_window_clamps_zero() {
        assert_eq!(film_page_window(0), film_page_window(1));
    }

    #[test]
    fn test_first_page_of_full_block() {
        let results = candidates(0..20);
        let page = select_film_page(&results, &HashSet::new(), 0);
        assert_eq!(ids(&page), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_seen_films_are_skipped() {
        let results = candidates(0..20);
        let seen = HashSet::from([1, 3]);
        let page = select_film_page(&results, &seen, 0);
        assert_eq!(ids(&page), vec![0, 2, 4, 5, 6]);
    }

    #[test]
    fn test_falls_back_to_raw_block_when_unseen_slice_is_empty() {
        let results = candidates(0..8);
        let seen: HashSet<u64> = (0..6).collect();
        let page = select_film_page(&results, &seen, 5);
        assert_eq!(ids(&page), vec![5, 6, 7]);
    }

    #[test]
    fn test_short_block_yields_empty_page() {
        let results = candidates(0..8);
        let page = select_film_page(&results, &HashSet::new(), 10);
        assert!(page.is_empty());
    }

    #[test]
    fn test_genre_page_shows_all_unseen() {
        let results = candidates(0..20);
        let seen = HashSet::from([0, 19]);
        let page = select_genre_page(&results, &seen);
        assert_eq!(page.len(), 18);
        assert_eq!(page[0].id, 1);
    }

    #[test]
    fn test_genre_page_falls_back_to_first_five() {
        let results = candidates(0..10);
        let seen: HashSet<u64> = (0..10).collect();
        let page = select_genre_page(&results, &seen);
        assert_eq!(ids(&page), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_genre_page_empty_results() {
        assert!(select_genre_page(&[], &HashSet::new()).is_empty());
    }
}
