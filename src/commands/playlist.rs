//! Playlist command handlers.

use anyhow::Result;
use reelfetch::library::{PlaylistStore, VideoItem};

use super::history::short_id;
use crate::app::settings::AppConfig;
use crate::cli::PlaylistCommand;

pub fn run_playlist_command(command: &PlaylistCommand, config: &AppConfig) -> Result<()> {
    let mut playlists = PlaylistStore::open(config.playlists_path());
    match command {
        PlaylistCommand::List => {
            if playlists.playlists().is_empty() {
                println!("No playlists yet.");
            }
            for playlist in playlists.playlists() {
                println!(
                    "{}  {:<24}  {:>3} videos  modified {}",
                    short_id(&playlist.id),
                    playlist.name,
                    playlist.video_count(),
                    playlist.last_modified_at.format("%Y-%m-%d %H:%M")
                );
            }
        }
        PlaylistCommand::Create { name } => {
            let playlist = playlists.create(name)?;
            println!("Created playlist '{}' ({})", playlist.name, playlist.id);
        }
        PlaylistCommand::Show { id } => {
            let playlist = playlists.get(id)?;
            println!("{} ({} videos)", playlist.name, playlist.video_count());
            for video in &playlist.videos {
                println!(
                    "  {}  {}  {}  {}",
                    short_id(&video.id),
                    video.display_duration(),
                    video.title,
                    video.video_url
                );
            }
        }
        PlaylistCommand::Add {
            id,
            url,
            title,
            subtitle,
        } => {
            let item = VideoItem::new(url, title.as_deref()).with_subtitle(subtitle.clone());
            let title = item.title.clone();
            if playlists.add_video(id, item)? {
                println!("Added '{title}'");
            } else {
                println!("Already in playlist: {url}");
            }
        }
        PlaylistCommand::Remove { id, video_id } => {
            let removed = playlists.remove_video(id, video_id)?;
            println!("Removed '{}'", removed.title);
        }
        PlaylistCommand::Rename { id, name } => {
            playlists.rename(id, name)?;
            println!("Renamed playlist to '{}'", name.trim());
        }
        PlaylistCommand::Delete { id } => {
            let removed = playlists.delete(id)?;
            println!("Deleted playlist '{}'", removed.name);
        }
    }
    Ok(())
}
